use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

pub const AUTH_SESSION_KEY: &str = "authenticated";

/// Redirects unauthenticated requests to /login. A missing APP_PASSWORD
/// disables the gate entirely.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if state.config.app_password.is_none() {
        return next.run(request).await;
    }

    let authenticated: bool = session
        .get(AUTH_SESSION_KEY)
        .await
        .unwrap_or(None)
        .unwrap_or(false);

    if authenticated {
        next.run(request).await
    } else {
        Redirect::to("/login").into_response()
    }
}

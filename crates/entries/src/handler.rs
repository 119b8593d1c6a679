use crate::models::RawCreateEntryRequest;
use crate::service::{EntryError, EntryService};
use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Form, Json, Router,
};
use common::AppState;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for EntryError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            EntryError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            EntryError::NotFound => (StatusCode::NOT_FOUND, "Entry not found".to_string()),
            EntryError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

#[derive(Template)]
#[template(path = "entries_view.html")]
pub struct EntriesViewTemplate {
    pub month: String,
    pub month_display: String,
    pub overview: FinancialOverview,
    pub entries: Vec<EntryView>,
}

pub struct FinancialOverview {
    pub total_income: String,
    pub total_expenses: String,
    pub net_balance: String,
    pub net_is_positive: bool,
}

#[derive(Template)]
#[template(path = "entry_row.html")]
pub struct EntryRowTemplate {
    pub e: EntryView,
}

pub struct EntryView {
    pub id: i64,
    pub entry_date: String,
    pub entry_date_display: String,
    pub amount_dollars: String,
    pub is_income: bool,
    pub description: String,
}

#[derive(Deserialize)]
pub struct MonthParam {
    pub month: String, // YYYY-MM
}

#[derive(Deserialize)]
pub struct UpdateEntryRequest {
    pub entry_date: String,
    pub amount_dollars: f64,
    pub kind: String,
    pub description: Option<String>,
}

pub fn entries_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Specific routes first
        .route("/add", post(create_entry))
        // Then parameterized routes
        .route("/{month}", get(get_month_view))
        .route("/entry/{id}", delete(delete_entry).put(update_entry))
        .with_state(state)
}

fn entry_view(e: crate::models::Entry) -> EntryView {
    let date_display = chrono::NaiveDate::parse_from_str(&e.entry_date, "%Y-%m-%d")
        .map(|d| d.format("%e %b %Y").to_string())
        .unwrap_or_else(|_| e.entry_date.clone());

    EntryView {
        id: e.id,
        entry_date_display: date_display,
        entry_date: e.entry_date,
        amount_dollars: format!("{:.2}", e.amount.abs() as f64 / 100.0),
        is_income: e.amount > 0,
        description: e.description.unwrap_or_default(),
    }
}

async fn get_month_view(
    State(state): State<Arc<AppState>>,
    Path(params): Path<MonthParam>,
) -> Result<impl IntoResponse, EntryError> {
    tracing::info!("Fetching entries view for: {}", params.month);

    let (entries, summary) = EntryService::get_month_view(&state.db, &params.month)
        .await
        .map_err(|e| {
            tracing::error!("get_month_view error: {:?}", e);
            e
        })?;

    let overview = FinancialOverview {
        total_income: format!("{:.2}", summary.total_income as f64 / 100.0),
        total_expenses: format!("{:.2}", summary.total_expenses as f64 / 100.0),
        net_balance: format!("{:.2}", summary.net as f64 / 100.0),
        net_is_positive: summary.net >= 0,
    };

    let month_display = chrono::NaiveDate::parse_from_str(&format!("{}-01", params.month), "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| params.month.clone());

    let template = EntriesViewTemplate {
        month: params.month,
        month_display,
        overview,
        entries: entries.into_iter().map(entry_view).collect(),
    };

    Ok(Html(template.render().map_err(|e| EntryError::Infrastructure(e.to_string()))?))
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<RawCreateEntryRequest>,
) -> Result<impl IntoResponse, EntryError> {
    let month = if payload.entry_date.len() >= 7 {
        payload.entry_date[0..7].to_string()
    } else {
        chrono::Local::now().format("%Y-%m").to_string()
    };

    EntryService::create_entry(
        &state.db,
        payload.entry_date,
        payload.amount_dollars,
        payload.kind == "income",
        payload.description,
    )
    .await
    .map_err(|e| {
        tracing::error!("create_entry error: {:?}", e);
        e
    })?;

    Ok(axum::response::Redirect::to(&format!("/entries/{}", month)))
}

async fn update_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEntryRequest>,
) -> Result<impl IntoResponse, EntryError> {
    let entry = EntryService::update_entry(
        &state.db,
        id,
        payload.entry_date,
        payload.amount_dollars,
        payload.kind == "income",
        payload.description,
    )
    .await?;

    let template = EntryRowTemplate { e: entry_view(entry) };
    Ok(Html(template.render().map_err(|e| EntryError::Infrastructure(e.to_string()))?))
}

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, EntryError> {
    EntryService::delete_entry(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

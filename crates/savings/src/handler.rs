use crate::models::{MonthRecord, SavingsSummary, Tone};
use crate::service::{SavingsError, SavingsService};
use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use common::AppState;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for SavingsError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            SavingsError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            SavingsError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

#[derive(Template)]
#[template(path = "savings_view.html")]
pub struct SavingsViewTemplate {
    pub month: String, // YYYY-MM
    pub month_display: String,
    pub prev_month: String,
    pub next_month: String,
    pub tone_class: &'static str,
    pub savings_display: String,
    pub rate_percent: String,
    pub has_last_month: bool,
    pub delta_display: String,
    pub has_target: bool,
    pub target_display: String,
    pub progress: u32,
    pub forecast_available: bool,
    pub horizon: usize,
    pub projected_display: String,
    pub likely_display: String,
    pub best_display: String,
    pub has_extremes: bool,
    pub best_month_label: String,
    pub best_month_rate: String,
    pub low_month_label: String,
    pub low_month_rate: String,
    pub saved_months: usize,
    pub window: usize,
    pub consistency_percent: String,
    pub dots: Vec<bool>, // oldest first; true = positive savings that month
    pub banner: Option<String>,
    pub rows: Vec<SeriesRowView>,
}

pub struct SeriesRowView {
    pub month_label: String,
    pub income: String,
    pub expenses: String,
    pub savings: String,
    pub is_positive: bool,
}

/// Read-only JSON rendering of the same snapshot the HTML page shows.
#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: SavingsSummary,
    pub series: Vec<MonthRecord>,
}

#[derive(Deserialize)]
pub struct MonthParam {
    pub month: String, // YYYY-MM
}

#[derive(Deserialize)]
pub struct SetTargetForm {
    pub month: String,
    pub target_dollars: f64,
}

pub fn savings_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Specific routes first
        .route("/target", post(set_target))
        // Then parameterized routes
        .route("/{month}", get(get_savings_view))
        .route("/{month}/summary", get(get_savings_summary))
        .with_state(state)
}

fn money(value: f64) -> String {
    if value < 0.0 {
        format!("-${:.2}", -value)
    } else {
        format!("${:.2}", value)
    }
}

fn month_label(key: &str) -> String {
    chrono::NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| key.to_string())
}

fn pick_banner(summary: &SavingsSummary, month_display: &str) -> Option<String> {
    let states = &summary.edge_states;
    if states.empty_series {
        Some("No savings data yet. Add income and expense entries to get started.".to_string())
    } else if states.single_month_history {
        Some("Only one month of history. Forecasts will firm up as more months accrue.".to_string())
    } else if states.expense_without_income {
        Some(format!("No income recorded for {} yet.", month_display))
    } else if states.income_without_expense {
        Some(format!("No expenses recorded for {} yet.", month_display))
    } else {
        None
    }
}

async fn get_savings_view(
    State(state): State<Arc<AppState>>,
    Path(params): Path<MonthParam>,
) -> Result<impl IntoResponse, SavingsError> {
    tracing::info!("Fetching savings view for: {}", params.month);

    let today = chrono::Local::now().date_naive();
    let (summary, series) = SavingsService::get_summary(&state.db, &params.month, today).await?;

    let month_display = chrono::NaiveDate::parse_from_str(&format!("{}-01", params.month), "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| params.month.clone());

    let (prev_month, next_month) = chrono::NaiveDate::parse_from_str(&format!("{}-01", params.month), "%Y-%m-%d")
        .map(|d| {
            let prev = d - chrono::Months::new(1);
            let next = d + chrono::Months::new(1);
            (prev.format("%Y-%m").to_string(), next.format("%Y-%m").to_string())
        })
        .unwrap_or_else(|_| (params.month.clone(), params.month.clone()));

    let tone_class = match summary.tone {
        Tone::Positive => "positive",
        Tone::Neutral => "neutral",
        Tone::Negative => "negative",
    };

    let (has_last_month, delta_display) = match (&summary.current, &summary.last_month) {
        (Some(current), Some(last)) => {
            let delta = current.savings() - last.savings();
            let sign = if delta >= 0.0 { "+" } else { "" };
            (true, format!("{}{} vs last month", sign, money(delta)))
        }
        _ => (false, String::new()),
    };

    let (has_extremes, best_month_label, best_month_rate, low_month_label, low_month_rate) =
        match (&summary.best_month, &summary.low_month) {
            (Some(best), Some(low)) => (
                true,
                month_label(&best.month),
                format!("{:.0}%", crate::aggregate::savings_rate(Some(best)) * 100.0),
                month_label(&low.month),
                format!("{:.0}%", crate::aggregate::savings_rate(Some(low)) * 100.0),
            ),
            _ => (false, String::new(), String::new(), String::new(), String::new()),
        };

    let banner = pick_banner(&summary, &month_display);

    // Oldest first so the dot scale reads left to right
    let dots: Vec<bool> = series.iter().rev().map(|r| r.savings() > 0.0).collect();

    let rows: Vec<SeriesRowView> = series
        .iter()
        .map(|r| SeriesRowView {
            month_label: month_label(&r.month),
            income: money(r.income),
            expenses: money(r.expenses),
            savings: money(r.savings()),
            is_positive: r.savings() > 0.0,
        })
        .collect();

    let template = SavingsViewTemplate {
        month: params.month,
        month_display,
        prev_month,
        next_month,
        tone_class,
        savings_display: money(summary.savings),
        rate_percent: format!("{:.0}%", summary.rate * 100.0),
        has_last_month,
        delta_display,
        has_target: summary.target.is_some(),
        target_display: summary.target.map(money).unwrap_or_default(),
        progress: summary.progress,
        forecast_available: summary.forecast.has_data,
        horizon: summary.forecast.horizon,
        projected_display: money(summary.forecast.projected),
        likely_display: money(summary.forecast.likely),
        best_display: money(summary.forecast.best),
        has_extremes,
        best_month_label,
        best_month_rate,
        low_month_label,
        low_month_rate,
        saved_months: summary.consistency.saved_months,
        window: summary.consistency.window,
        consistency_percent: format!("{:.0}%", summary.consistency.ratio * 100.0),
        dots,
        banner,
        rows,
    };

    Ok(Html(template.render().map_err(|e| SavingsError::Infrastructure(e.to_string()))?))
}

async fn get_savings_summary(
    State(state): State<Arc<AppState>>,
    Path(params): Path<MonthParam>,
) -> Result<Json<SummaryResponse>, SavingsError> {
    let today = chrono::Local::now().date_naive();
    let (summary, series) = SavingsService::get_summary(&state.db, &params.month, today).await?;

    Ok(Json(SummaryResponse { summary, series }))
}

async fn set_target(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<SetTargetForm>,
) -> Result<impl IntoResponse, SavingsError> {
    let month = payload.month.clone();
    SavingsService::set_target(&state.db, payload.month, payload.target_dollars)
        .await
        .map_err(|e| {
            tracing::error!("set_target error: {:?}", e);
            e
        })?;

    // Back to the page for the month that was just targeted
    let month_param = month.get(0..7).unwrap_or(&month).to_string();
    Ok(Redirect::to(&format!("/savings/{}", month_param)))
}

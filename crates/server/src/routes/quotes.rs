//! Public quote submission endpoint fed by the wizard.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use atelier_core::domain::catalog::format_cents;
use atelier_core::pricing::Aggregate;
use atelier_core::validate::QuotePayload;
use atelier_core::workflow::SubmittedQuote;

use super::{reject, ApiError, AppState};
use crate::auth;

#[derive(Debug, Serialize)]
pub struct SubmittedResponse {
    pub quote_id: String,
    pub status: &'static str,
    pub aggregate: Aggregate,
    /// Customer-facing rendering of the total ("2400 €", "à partir de
    /// 2400 €" or "sur devis").
    pub total_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_token: Option<String>,
}

pub fn total_label(aggregate: &Aggregate) -> String {
    match aggregate.total_price_cents {
        None => "sur devis".to_string(),
        Some(cents) if aggregate.is_from_estimate => {
            format!("à partir de {} €", format_cents(cents))
        }
        Some(cents) => format!("{} €", format_cents(cents)),
    }
}

impl From<SubmittedQuote> for SubmittedResponse {
    fn from(submitted: SubmittedQuote) -> Self {
        Self {
            quote_id: submitted.quote.id.0,
            status: submitted.quote.status.as_str(),
            total_label: total_label(&submitted.aggregate),
            aggregate: submitted.aggregate,
            appointment_token: submitted.appointment_token.map(|token| token.0),
        }
    }
}

pub async fn submit_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<QuotePayload>,
) -> Result<(StatusCode, Json<SubmittedResponse>), (StatusCode, Json<ApiError>)> {
    let caller = auth::caller_from_headers(&headers, &state.config);

    let submitted = state
        .quotes
        .submit(&payload, &caller, Utc::now())
        .await
        .map_err(reject)?;

    info!(
        event_name = "api.quote.submitted",
        quote_id = %submitted.quote.id.0,
        option_count = submitted.quote.selections.len(),
        requires_quote = submitted.aggregate.requires_quote,
        "quote request received"
    );

    Ok((StatusCode::CREATED, Json(SubmittedResponse::from(submitted))))
}

//! Admin quote management: listing, inspection with recomputed totals,
//! atomic option replacement, status transitions and deletion. Privilege
//! is enforced by the workflow layer; these handlers only translate HTTP.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use atelier_core::domain::quote::{QuoteId, QuoteRequest};
use atelier_core::errors::ApplicationError;
use atelier_core::validate::{parse_status, SelectionPayload};
use atelier_core::workflow::QuoteDetail;

use super::{reject, ApiError, AppState};
use crate::auth;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub status: &'static str,
    pub option_count: usize,
    pub has_appointment: bool,
    pub created_at: String,
}

impl From<QuoteRequest> for QuoteSummary {
    fn from(quote: QuoteRequest) -> Self {
        Self {
            id: quote.id.0.clone(),
            email: quote.contact.email.clone(),
            name: quote.contact.display_name(),
            status: quote.status.as_str(),
            option_count: quote.selections.len(),
            has_appointment: quote.appointment_id.is_some(),
            created_at: quote.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplaceOptionsRequest {
    pub options: Vec<SelectionPayload>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

pub async fn list_quotes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<QuoteSummary>>, (StatusCode, Json<ApiError>)> {
    let caller = auth::caller_from_headers(&headers, &state.config);

    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            parse_status(raw)
                .map_err(|error| reject(ApplicationError::Rejected(vec![error])))?,
        ),
    };

    let quotes = state.quotes.list(status, &caller).await.map_err(reject)?;
    Ok(Json(quotes.into_iter().map(QuoteSummary::from).collect()))
}

pub async fn get_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<QuoteDetail>, (StatusCode, Json<ApiError>)> {
    let caller = auth::caller_from_headers(&headers, &state.config);
    let detail = state.quotes.get(&QuoteId(id), &caller).await.map_err(reject)?;
    Ok(Json(detail))
}

pub async fn replace_options(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReplaceOptionsRequest>,
) -> Result<Json<QuoteDetail>, (StatusCode, Json<ApiError>)> {
    let caller = auth::caller_from_headers(&headers, &state.config);
    let quote_id = QuoteId(id);

    let detail = state
        .quotes
        .replace_options(&quote_id, &body.options, &caller)
        .await
        .map_err(reject)?;

    info!(
        event_name = "api.admin.options_replaced",
        quote_id = %quote_id.0,
        option_count = detail.quote.selections.len(),
        "quote option set replaced"
    );

    Ok(Json(detail))
}

pub async fn set_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<QuoteSummary>, (StatusCode, Json<ApiError>)> {
    let caller = auth::caller_from_headers(&headers, &state.config);
    let quote_id = QuoteId(id);

    let updated = state
        .quotes
        .set_status(&quote_id, &body.status, &caller)
        .await
        .map_err(reject)?;

    info!(
        event_name = "api.admin.status_changed",
        quote_id = %quote_id.0,
        status = updated.status.as_str(),
        "quote status changed"
    );

    Ok(Json(QuoteSummary::from(updated)))
}

pub async fn delete_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let caller = auth::caller_from_headers(&headers, &state.config);
    let quote_id = QuoteId(id);

    state.quotes.delete(&quote_id, &caller).await.map_err(reject)?;

    info!(
        event_name = "api.admin.quote_deleted",
        quote_id = %quote_id.0,
        "quote deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

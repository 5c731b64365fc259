//! Appointment booking and the pending-token completion flow.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use atelier_core::domain::appointment::{Appointment, PendingToken};
use atelier_core::validate::AppointmentPayload;
use atelier_core::workflow::BookedAppointment;

use super::{reject, ApiError, AppState};
use crate::auth;

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub appointment_id: String,
    pub status: &'static str,
    pub scheduled_at: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AppointmentResponse {
    fn new(appointment: Appointment, token: Option<PendingToken>) -> Self {
        Self {
            appointment_id: appointment.id.0,
            status: appointment.status.as_str(),
            scheduled_at: appointment.scheduled_at.to_rfc3339(),
            reason: appointment.reason,
            token: token.map(|token| token.0),
        }
    }
}

impl From<BookedAppointment> for AppointmentResponse {
    fn from(booked: BookedAppointment) -> Self {
        Self::new(booked.appointment, booked.token)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub token: String,
}

pub async fn book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AppointmentPayload>,
) -> Result<(StatusCode, Json<AppointmentResponse>), (StatusCode, Json<ApiError>)> {
    let caller = auth::caller_from_headers(&headers, &state.config);

    let booked = state
        .appointments
        .book(&payload, &caller, Utc::now())
        .await
        .map_err(reject)?;

    info!(
        event_name = "api.appointment.booked",
        appointment_id = %booked.appointment.id.0,
        status = booked.appointment.status.as_str(),
        "appointment booked"
    );

    Ok((StatusCode::CREATED, Json(AppointmentResponse::from(booked))))
}

/// Preview of a still-pending booking, shown after the visitor signs in.
pub async fn pending(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<AppointmentResponse>, (StatusCode, Json<ApiError>)> {
    let appointment = state
        .appointments
        .find_pending(&PendingToken(token))
        .await
        .map_err(reject)?;

    Ok(Json(AppointmentResponse::new(appointment, None)))
}

pub async fn complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CompleteRequest>,
) -> Result<Json<AppointmentResponse>, (StatusCode, Json<ApiError>)> {
    let caller = auth::caller_from_headers(&headers, &state.config);

    let confirmed = state
        .appointments
        .complete(&PendingToken(body.token), &caller)
        .await
        .map_err(reject)?;

    info!(
        event_name = "api.appointment.completed",
        appointment_id = %confirmed.id.0,
        "pending appointment confirmed"
    );

    Ok(Json(AppointmentResponse::new(confirmed, None)))
}

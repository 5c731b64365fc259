use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tracing::error;

use atelier_core::config::AppConfig;
use atelier_core::errors::ApplicationError;
use atelier_core::notify::Notifier;
use atelier_core::validate::FieldError;
use atelier_core::workflow::{AppointmentService, QuoteService};
use atelier_core::AccessError;
use atelier_db::{SqlCatalogStore, SqlRequestStore};

pub mod admin;
pub mod appointments;
pub mod catalog;
pub mod quotes;

pub type Catalog = Arc<SqlCatalogStore>;
pub type Requests = Arc<SqlRequestStore>;
pub type SharedNotifier = Arc<dyn Notifier>;
pub type Quotes = QuoteService<Catalog, Requests, SharedNotifier>;
pub type Appointments = AppointmentService<Requests, SharedNotifier>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Catalog,
    pub quotes: Arc<Quotes>,
    pub appointments: Arc<Appointments>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public catalog for the wizard
        .route("/api/offers", get(catalog::list_offers))
        .route("/api/options", get(catalog::list_options))
        // Public submissions
        .route("/api/quotes", post(quotes::submit_quote))
        .route("/api/appointments", post(appointments::book))
        .route("/api/appointments/pending/{token}", get(appointments::pending))
        .route("/api/appointments/complete", post(appointments::complete))
        // Admin area
        .route("/api/admin/quotes", get(admin::list_quotes))
        .route(
            "/api/admin/quotes/{id}",
            get(admin::get_quote).delete(admin::delete_quote),
        )
        .route("/api/admin/quotes/{id}/options", patch(admin::replace_options))
        .route("/api/admin/quotes/{id}/status", put(admin::set_status))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl ApiError {
    fn message(error: impl Into<String>) -> Self {
        Self { error: error.into(), fields: None }
    }
}

/// Map an operation failure onto its stable HTTP outcome. The three
/// transition-rejection classes stay distinguishable, and internal detail
/// goes to the log rather than the wire.
pub fn reject(error: ApplicationError) -> (StatusCode, Json<ApiError>) {
    match error {
        ApplicationError::Rejected(fields) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError { error: "validation failed".to_string(), fields: Some(fields) }),
        ),
        ApplicationError::Access(AccessError::Unauthenticated) => (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::message("authentication required")),
        ),
        ApplicationError::Access(AccessError::Forbidden) => {
            (StatusCode::FORBIDDEN, Json(ApiError::message("insufficient privileges")))
        }
        ApplicationError::NotFound(what) => {
            (StatusCode::NOT_FOUND, Json(ApiError::message(format!("{what} not found"))))
        }
        ApplicationError::Domain(inner) => {
            error!(event_name = "api.domain_error", error = %inner, "domain invariant failure");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::message("an internal error occurred")))
        }
        ApplicationError::Store(inner) => {
            error!(event_name = "api.store_error", error = %inner, "persistence failure");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError::message("the service is temporarily unavailable")),
            )
        }
    }
}

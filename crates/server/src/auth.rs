//! Caller identity at the HTTP edge. The OAuth handshake itself happens
//! upstream; by the time a request reaches these routes its identity is
//! carried in headers, and this module folds them into the explicit
//! `Caller` value the core operations take.
//!
//! - `Authorization: Bearer <token>` matching the configured admin token
//!   grants the admin identity.
//! - `x-user-id` / `x-user-email` (set by the authenticating proxy)
//!   identify a signed-in customer.
//! - Anything else is anonymous.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use atelier_core::config::AppConfig;
use atelier_core::domain::caller::{Caller, Identity};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

pub fn caller_from_headers(headers: &HeaderMap, config: &AppConfig) -> Caller {
    if let Some(token) = bearer_token(headers) {
        if config.admin_token_matches(token) {
            return Caller::Authenticated(Identity {
                id: "admin".to_string(),
                email: config.admin.email.clone(),
                is_admin: true,
            });
        }
    }

    let id = header_value(headers, USER_ID_HEADER);
    let email = header_value(headers, USER_EMAIL_HEADER);
    match (id, email) {
        (Some(id), Some(email)) => {
            Caller::Authenticated(Identity { id, email, is_admin: false })
        }
        _ => Caller::Anonymous,
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

//! Public catalog endpoints backing the wizard's offer and option steps.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use atelier_core::domain::catalog::{OfferOption, ServiceOffer};
use atelier_core::stores::CatalogStore;

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub price_label: String,
    pub duration_days: u32,
    pub included_option_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OptionResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub pricing_type: &'static str,
    pub display_price: String,
    pub duration_days: u32,
    pub rank: i64,
}

impl From<ServiceOffer> for OfferResponse {
    fn from(offer: ServiceOffer) -> Self {
        Self {
            id: offer.id.0,
            slug: offer.slug,
            title: offer.title,
            price_label: offer.price_label,
            duration_days: offer.duration_days,
            included_option_ids: offer
                .included_option_ids
                .into_iter()
                .map(|option_id| option_id.0)
                .collect(),
        }
    }
}

impl From<OfferOption> for OptionResponse {
    fn from(option: OfferOption) -> Self {
        Self {
            id: option.id.0,
            slug: option.slug,
            title: option.title,
            pricing_type: option.pricing.kind().as_str(),
            display_price: option.pricing.display_label(),
            duration_days: option.duration_days,
            rank: option.rank,
        }
    }
}

pub async fn list_offers(
    State(state): State<AppState>,
) -> Result<Json<Vec<OfferResponse>>, (StatusCode, Json<ApiError>)> {
    let offers = state.catalog.list_offers().await.map_err(store_error)?;
    Ok(Json(offers.into_iter().map(OfferResponse::from).collect()))
}

pub async fn list_options(
    State(state): State<AppState>,
) -> Result<Json<Vec<OptionResponse>>, (StatusCode, Json<ApiError>)> {
    let options = state.catalog.list_options().await.map_err(store_error)?;
    Ok(Json(options.into_iter().map(OptionResponse::from).collect()))
}

fn store_error(
    error: atelier_core::stores::StoreError,
) -> (StatusCode, Json<ApiError>) {
    super::reject(atelier_core::errors::ApplicationError::Store(error))
}

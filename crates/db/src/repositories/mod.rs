use atelier_core::stores::StoreError;

pub mod catalog;
pub mod request;

pub use catalog::SqlCatalogStore;
pub use request::SqlRequestStore;

pub(crate) fn db_error(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}

pub(crate) fn decode_error(detail: impl std::fmt::Display) -> StoreError {
    StoreError::Decode(detail.to_string())
}

use thiserror::Error;

use crate::domain::appointment::AppointmentStatus;
use crate::domain::caller::AccessError;
use crate::stores::StoreError;
use crate::validate::FieldError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("appointment cannot be confirmed from status {status:?}")]
    AppointmentNotPending { status: AppointmentStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Operation-level failure for every workflow entry point. Each variant
/// maps to a distinct, stable caller-facing outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    /// The submission failed validation; every field error is carried so
    /// the caller can redisplay the form in one round trip.
    #[error("submission rejected ({} field error(s))", .0.len())]
    Rejected(Vec<FieldError>),
    #[error(transparent)]
    Access(#[from] AccessError),
    /// Also covers spent single-use tokens: a presented-twice token is
    /// indistinguishable from one that never existed.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

impl ApplicationError {
    /// Message safe to show to an end user, without internal detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "Some fields are invalid. Check the form and try again.",
            Self::Access(AccessError::Unauthenticated) => "Please sign in and try again.",
            Self::Access(AccessError::Forbidden) => "You are not allowed to perform this action.",
            Self::NotFound(_) => "The requested record was not found.",
            Self::Domain(_) => "The request could not be processed.",
            Self::Store(_) => "The service is temporarily unavailable. Please retry shortly.",
        }
    }
}

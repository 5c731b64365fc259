pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod pricing;
pub mod stores;
pub mod validate;
pub mod wizard;
pub mod workflow;

pub use domain::appointment::{Appointment, AppointmentId, AppointmentStatus, PendingToken};
pub use domain::caller::{AccessError, Caller, Identity};
pub use domain::catalog::{OfferId, OfferOption, OptionId, Pricing, PricingKind, ServiceOffer};
pub use domain::quote::{Contact, QuoteId, QuoteRequest, QuoteStatus, Selection};
pub use errors::{ApplicationError, DomainError};
pub use notify::{Notifier, NoopNotifier};
pub use pricing::{aggregate, aggregate_with_breakdown, Aggregate, LineContribution};
pub use stores::{CatalogStore, RequestStore, StoreError};
pub use validate::{ErrorCode, FieldError};
pub use workflow::{AppointmentService, BookedAppointment, QuoteDetail, QuoteService, SubmittedQuote};

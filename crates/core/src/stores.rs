//! Collaborator ports for persistence. The workflow layer only ever talks
//! to these traits; sqlx-backed implementations live in the db crate and
//! the in-memory ones below back the core tests and dev tooling.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::appointment::{Appointment, PendingToken};
use crate::domain::catalog::{OfferId, OfferOption, OptionId, ServiceOffer};
use crate::domain::quote::{QuoteId, QuoteRequest, QuoteStatus, Selection};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-only catalog of offers and options.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_offer(&self, id: &OfferId) -> Result<Option<ServiceOffer>, StoreError>;
    async fn find_option(&self, id: &OptionId) -> Result<Option<OfferOption>, StoreError>;
    async fn list_offers(&self) -> Result<Vec<ServiceOffer>, StoreError>;
    /// Options in display order (rank, then slug).
    async fn list_options(&self) -> Result<Vec<OfferOption>, StoreError>;
}

/// Persisted quote requests and appointments.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create_quote(&self, quote: QuoteRequest) -> Result<QuoteRequest, StoreError>;
    async fn find_quote(&self, id: &QuoteId) -> Result<Option<QuoteRequest>, StoreError>;
    async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<QuoteRequest>, StoreError>;
    /// Replace the full option set in one atomic operation; no caller can
    /// observe a quote with a partially swapped selection.
    async fn replace_quote_options(
        &self,
        id: &QuoteId,
        selections: Vec<Selection>,
    ) -> Result<Option<QuoteRequest>, StoreError>;
    async fn set_quote_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
    ) -> Result<Option<QuoteRequest>, StoreError>;
    /// Returns whether a row was actually removed.
    async fn delete_quote(&self, id: &QuoteId) -> Result<bool, StoreError>;

    async fn create_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, StoreError>;
    async fn find_appointment_by_token(
        &self,
        token: &PendingToken,
    ) -> Result<Option<Appointment>, StoreError>;
    /// Atomically claim a pending token: binds the identity, confirms the
    /// appointment and clears the token, succeeding for at most one caller.
    /// A spent or unknown token yields `None`.
    async fn confirm_appointment_by_token(
        &self,
        token: &PendingToken,
        user_email: &str,
    ) -> Result<Option<Appointment>, StoreError>;
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for std::sync::Arc<T> {
    async fn find_offer(&self, id: &OfferId) -> Result<Option<ServiceOffer>, StoreError> {
        (**self).find_offer(id).await
    }

    async fn find_option(&self, id: &OptionId) -> Result<Option<OfferOption>, StoreError> {
        (**self).find_option(id).await
    }

    async fn list_offers(&self) -> Result<Vec<ServiceOffer>, StoreError> {
        (**self).list_offers().await
    }

    async fn list_options(&self) -> Result<Vec<OfferOption>, StoreError> {
        (**self).list_options().await
    }
}

#[async_trait]
impl<T: RequestStore + ?Sized> RequestStore for std::sync::Arc<T> {
    async fn create_quote(&self, quote: QuoteRequest) -> Result<QuoteRequest, StoreError> {
        (**self).create_quote(quote).await
    }

    async fn find_quote(&self, id: &QuoteId) -> Result<Option<QuoteRequest>, StoreError> {
        (**self).find_quote(id).await
    }

    async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<QuoteRequest>, StoreError> {
        (**self).list_quotes(status).await
    }

    async fn replace_quote_options(
        &self,
        id: &QuoteId,
        selections: Vec<Selection>,
    ) -> Result<Option<QuoteRequest>, StoreError> {
        (**self).replace_quote_options(id, selections).await
    }

    async fn set_quote_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
    ) -> Result<Option<QuoteRequest>, StoreError> {
        (**self).set_quote_status(id, status).await
    }

    async fn delete_quote(&self, id: &QuoteId) -> Result<bool, StoreError> {
        (**self).delete_quote(id).await
    }

    async fn create_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, StoreError> {
        (**self).create_appointment(appointment).await
    }

    async fn find_appointment_by_token(
        &self,
        token: &PendingToken,
    ) -> Result<Option<Appointment>, StoreError> {
        (**self).find_appointment_by_token(token).await
    }

    async fn confirm_appointment_by_token(
        &self,
        token: &PendingToken,
        user_email: &str,
    ) -> Result<Option<Appointment>, StoreError> {
        (**self).confirm_appointment_by_token(token, user_email).await
    }
}

pub mod memory {
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    use async_trait::async_trait;

    use crate::domain::appointment::{Appointment, PendingToken};
    use crate::domain::catalog::{OfferId, OfferOption, OptionId, ServiceOffer};
    use crate::domain::quote::{QuoteId, QuoteRequest, QuoteStatus, Selection};

    use super::{CatalogStore, RequestStore, StoreError};

    /// Catalog held as plain vectors; the component never mutates it.
    #[derive(Default)]
    pub struct InMemoryCatalogStore {
        offers: Vec<ServiceOffer>,
        options: Vec<OfferOption>,
    }

    impl InMemoryCatalogStore {
        pub fn new(offers: Vec<ServiceOffer>, options: Vec<OfferOption>) -> Self {
            Self { offers, options }
        }
    }

    #[async_trait]
    impl CatalogStore for InMemoryCatalogStore {
        async fn find_offer(&self, id: &OfferId) -> Result<Option<ServiceOffer>, StoreError> {
            Ok(self.offers.iter().find(|offer| &offer.id == id).cloned())
        }

        async fn find_option(&self, id: &OptionId) -> Result<Option<OfferOption>, StoreError> {
            Ok(self.options.iter().find(|option| &option.id == id).cloned())
        }

        async fn list_offers(&self) -> Result<Vec<ServiceOffer>, StoreError> {
            Ok(self.offers.clone())
        }

        async fn list_options(&self) -> Result<Vec<OfferOption>, StoreError> {
            let mut options = self.options.clone();
            options.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.slug.cmp(&b.slug)));
            Ok(options)
        }
    }

    #[derive(Default)]
    pub struct InMemoryRequestStore {
        quotes: Mutex<HashMap<String, QuoteRequest>>,
        appointments: Mutex<HashMap<String, Appointment>>,
    }

    impl InMemoryRequestStore {
        fn quotes(&self) -> MutexGuard<'_, HashMap<String, QuoteRequest>> {
            match self.quotes.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            }
        }

        fn appointments(&self) -> MutexGuard<'_, HashMap<String, Appointment>> {
            match self.appointments.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            }
        }
    }

    #[async_trait]
    impl RequestStore for InMemoryRequestStore {
        async fn create_quote(&self, quote: QuoteRequest) -> Result<QuoteRequest, StoreError> {
            self.quotes().insert(quote.id.0.clone(), quote.clone());
            Ok(quote)
        }

        async fn find_quote(&self, id: &QuoteId) -> Result<Option<QuoteRequest>, StoreError> {
            Ok(self.quotes().get(&id.0).cloned())
        }

        async fn list_quotes(
            &self,
            status: Option<QuoteStatus>,
        ) -> Result<Vec<QuoteRequest>, StoreError> {
            let mut quotes: Vec<QuoteRequest> = self
                .quotes()
                .values()
                .filter(|quote| status.map_or(true, |wanted| quote.status == wanted))
                .cloned()
                .collect();
            quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(quotes)
        }

        async fn replace_quote_options(
            &self,
            id: &QuoteId,
            selections: Vec<Selection>,
        ) -> Result<Option<QuoteRequest>, StoreError> {
            let mut quotes = self.quotes();
            Ok(quotes.get_mut(&id.0).map(|quote| {
                quote.selections = selections;
                quote.clone()
            }))
        }

        async fn set_quote_status(
            &self,
            id: &QuoteId,
            status: QuoteStatus,
        ) -> Result<Option<QuoteRequest>, StoreError> {
            let mut quotes = self.quotes();
            Ok(quotes.get_mut(&id.0).map(|quote| {
                quote.set_status(status);
                quote.clone()
            }))
        }

        async fn delete_quote(&self, id: &QuoteId) -> Result<bool, StoreError> {
            Ok(self.quotes().remove(&id.0).is_some())
        }

        async fn create_appointment(
            &self,
            appointment: Appointment,
        ) -> Result<Appointment, StoreError> {
            self.appointments().insert(appointment.id.0.clone(), appointment.clone());
            Ok(appointment)
        }

        async fn find_appointment_by_token(
            &self,
            token: &PendingToken,
        ) -> Result<Option<Appointment>, StoreError> {
            Ok(self
                .appointments()
                .values()
                .find(|appointment| appointment.pending_token.as_ref() == Some(token))
                .cloned())
        }

        async fn confirm_appointment_by_token(
            &self,
            token: &PendingToken,
            user_email: &str,
        ) -> Result<Option<Appointment>, StoreError> {
            let mut appointments = self.appointments();
            let Some(appointment) = appointments
                .values_mut()
                .find(|appointment| appointment.pending_token.as_ref() == Some(token))
            else {
                return Ok(None);
            };

            match appointment.confirm_for(user_email) {
                Ok(()) => Ok(Some(appointment.clone())),
                // A matched token implies a pending appointment; treat any
                // inconsistency the same as a spent token.
                Err(_) => Ok(None),
            }
        }
    }

}

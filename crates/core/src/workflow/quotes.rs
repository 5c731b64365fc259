//! Quote request operations: public submission and the admin lifecycle.
//! Every entry point takes the caller explicitly and runs to completion
//! within the request.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::appointment::{Appointment, PendingToken};
use crate::domain::caller::Caller;
use crate::domain::catalog::{OfferOption, OptionId, ServiceOffer};
use crate::domain::quote::{QuoteId, QuoteRequest, QuoteStatus, Selection};
use crate::errors::{ApplicationError, DomainError};
use crate::notify::Notifier;
use crate::pricing::{aggregate_with_breakdown, Aggregate, LineContribution};
use crate::stores::{CatalogStore, RequestStore};
use crate::validate::{
    selection_errors, validate_quote, ErrorCode, FieldError, QuotePayload, SelectionPayload,
};

pub struct QuoteService<C, R, N> {
    catalog: C,
    requests: R,
    notifier: N,
}

/// Outcome of a successful submission. The pending token is only present
/// when the submission embedded an appointment booked anonymously.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmittedQuote {
    pub quote: QuoteRequest,
    pub aggregate: Aggregate,
    pub appointment_token: Option<PendingToken>,
}

/// A stored quote with its recomputed totals and per-option breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteDetail {
    pub quote: QuoteRequest,
    pub aggregate: Aggregate,
    pub lines: Vec<LineContribution>,
}

impl<C, R, N> QuoteService<C, R, N>
where
    C: CatalogStore,
    R: RequestStore,
    N: Notifier,
{
    pub fn new(catalog: C, requests: R, notifier: N) -> Self {
        Self { catalog, requests, notifier }
    }

    /// Validate and persist a submission from the public wizard. No store
    /// write happens unless the full payload — field rules and catalog
    /// references alike — is acceptable.
    pub async fn submit(
        &self,
        payload: &QuotePayload,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<SubmittedQuote, ApplicationError> {
        let normalized = validate_quote(payload, caller, now)
            .map_err(ApplicationError::Rejected)?;

        let (offer, selections) = self.resolve_references(&normalized).await?;

        let (aggregate, _) = aggregate_with_breakdown(
            offer.as_ref(),
            &resolved_pairs(&selections, &normalized.selections),
        );

        // The embedded appointment is persisted first so the quote can
        // link to it; anonymous bookings stay pending behind their token.
        let (appointment_id, appointment_token) = match &normalized.appointment {
            None => (None, None),
            Some(slot) => {
                let appointment = match caller.identity() {
                    None => Appointment::pending(
                        slot.scheduled_at,
                        slot.reason.clone(),
                        slot.details.clone(),
                        now,
                    ),
                    Some(identity) => Appointment::confirmed(
                        slot.scheduled_at,
                        slot.reason.clone(),
                        slot.details.clone(),
                        identity.email.clone(),
                        now,
                    ),
                };
                let created = self.requests.create_appointment(appointment).await?;
                (Some(created.id.clone()), created.pending_token.clone())
            }
        };

        let quote = QuoteRequest {
            id: QuoteId::generate(),
            contact: normalized.contact,
            project_description: normalized.project_description,
            desired_delivery_date: normalized.desired_delivery_date,
            offer_id: normalized.offer_id,
            selections: normalized.selections,
            status: QuoteStatus::New,
            appointment_id,
            created_at: now,
        };

        let created = self.requests.create_quote(quote).await?;
        self.notifier.quote_received(&created).await;

        Ok(SubmittedQuote { quote: created, aggregate, appointment_token })
    }

    /// Fetch one quote with its recomputed aggregate. Owners see their own
    /// quotes; admins see everything.
    pub async fn get(&self, id: &QuoteId, caller: &Caller) -> Result<QuoteDetail, ApplicationError> {
        let quote = self
            .requests
            .find_quote(id)
            .await?
            .ok_or(ApplicationError::NotFound("quote"))?;
        caller.require_owner_or_admin(&quote.contact.email)?;

        self.detail(quote).await
    }

    /// Admin listing, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<QuoteStatus>,
        caller: &Caller,
    ) -> Result<Vec<QuoteRequest>, ApplicationError> {
        caller.require_admin()?;
        Ok(self.requests.list_quotes(status).await?)
    }

    /// Admin PATCH: replace the full option set atomically and recompute
    /// the aggregate. Old selections are discarded, never merged.
    pub async fn replace_options(
        &self,
        id: &QuoteId,
        options: &[SelectionPayload],
        caller: &Caller,
    ) -> Result<QuoteDetail, ApplicationError> {
        caller.require_admin()?;

        let errors = selection_errors(options);
        if !errors.is_empty() {
            return Err(ApplicationError::Rejected(errors));
        }

        let selections: Vec<Selection> = options
            .iter()
            .filter_map(|selection| {
                selection.option_id.as_deref().map(|option_id| Selection {
                    option_id: OptionId(option_id.trim().to_string()),
                    quantity: selection.quantity.unwrap_or(1) as u32,
                })
            })
            .collect();

        let mut errors = Vec::new();
        for (index, selection) in selections.iter().enumerate() {
            if self.catalog.find_option(&selection.option_id).await?.is_none() {
                errors.push(unknown_option(index, &selection.option_id.0));
            }
        }
        if !errors.is_empty() {
            return Err(ApplicationError::Rejected(errors));
        }

        let updated = self
            .requests
            .replace_quote_options(id, selections)
            .await?
            .ok_or(ApplicationError::NotFound("quote"))?;

        self.detail(updated).await
    }

    /// Admin status transition. The target only has to be inside the
    /// closed set; backward moves are allowed.
    pub async fn set_status(
        &self,
        id: &QuoteId,
        target: &str,
        caller: &Caller,
    ) -> Result<QuoteRequest, ApplicationError> {
        caller.require_admin()?;
        let status = crate::validate::parse_status(target)
            .map_err(|error| ApplicationError::Rejected(vec![error]))?;

        self.requests
            .set_quote_status(id, status)
            .await?
            .ok_or(ApplicationError::NotFound("quote"))
    }

    pub async fn delete(&self, id: &QuoteId, caller: &Caller) -> Result<(), ApplicationError> {
        caller.require_admin()?;
        if self.requests.delete_quote(id).await? {
            Ok(())
        } else {
            Err(ApplicationError::NotFound("quote"))
        }
    }

    /// Recompute the aggregate for a stored quote against the current
    /// catalog. Deterministic: the same quote yields the same totals.
    async fn detail(&self, quote: QuoteRequest) -> Result<QuoteDetail, ApplicationError> {
        let offer = match &quote.offer_id {
            None => None,
            Some(offer_id) => Some(self.catalog.find_offer(offer_id).await?.ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "quote {} references unknown offer `{}`",
                    quote.id.0, offer_id.0
                ))
            })?),
        };

        let mut resolved = Vec::with_capacity(quote.selections.len());
        for selection in &quote.selections {
            let option = self
                .catalog
                .find_option(&selection.option_id)
                .await?
                .ok_or_else(|| {
                    DomainError::InvariantViolation(format!(
                        "quote {} references unknown option `{}`",
                        quote.id.0, selection.option_id.0
                    ))
                })?;
            resolved.push((option, selection.quantity));
        }

        let (aggregate, lines) = aggregate_with_breakdown(offer.as_ref(), &resolved);
        Ok(QuoteDetail { quote, aggregate, lines })
    }

    /// Resolve the offer and every selected option, collecting one
    /// `UNKNOWN_REFERENCE` per missing id.
    async fn resolve_references(
        &self,
        normalized: &crate::validate::NewQuote,
    ) -> Result<(Option<ServiceOffer>, Vec<OfferOption>), ApplicationError> {
        let mut errors = Vec::new();

        let offer = match &normalized.offer_id {
            None => None,
            Some(offer_id) => {
                let offer = self.catalog.find_offer(offer_id).await?;
                if offer.is_none() {
                    errors.push(FieldError::new(
                        "offer_id",
                        ErrorCode::UnknownReference,
                        format!("offer `{}` does not exist", offer_id.0),
                    ));
                }
                offer
            }
        };

        let mut options = Vec::with_capacity(normalized.selections.len());
        for (index, selection) in normalized.selections.iter().enumerate() {
            match self.catalog.find_option(&selection.option_id).await? {
                Some(option) => options.push(option),
                None => errors.push(unknown_option(index, &selection.option_id.0)),
            }
        }

        if errors.is_empty() {
            Ok((offer, options))
        } else {
            Err(ApplicationError::Rejected(errors))
        }
    }
}

fn unknown_option(index: usize, option_id: &str) -> FieldError {
    FieldError::new(
        format!("options[{index}].option_id"),
        ErrorCode::UnknownReference,
        format!("option `{option_id}` does not exist"),
    )
}

fn resolved_pairs(options: &[OfferOption], selections: &[Selection]) -> Vec<(OfferOption, u32)> {
    options
        .iter()
        .cloned()
        .zip(selections.iter().map(|selection| selection.quantity))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::domain::caller::{AccessError, Caller, Identity};
    use crate::domain::catalog::{
        OfferId, OfferOption, OptionId, Pricing, ServiceOffer,
    };
    use crate::domain::quote::QuoteStatus;
    use crate::errors::ApplicationError;
    use crate::notify::{Notification, RecordingNotifier};
    use crate::stores::memory::{InMemoryCatalogStore, InMemoryRequestStore};
    use crate::stores::RequestStore;
    use crate::validate::{
        AppointmentPayload, ErrorCode, QuotePayload, SelectionPayload,
    };

    use super::QuoteService;

    type Service =
        QuoteService<Arc<InMemoryCatalogStore>, Arc<InMemoryRequestStore>, RecordingNotifier>;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).single().expect("fixed clock")
    }

    fn catalog() -> InMemoryCatalogStore {
        let offers = vec![ServiceOffer {
            id: OfferId("offre-vitrine".to_string()),
            slug: "offre-vitrine".to_string(),
            title: "Site vitrine".to_string(),
            price_label: "à partir de 1900 €".to_string(),
            duration_days: 8,
            included_option_ids: std::iter::once(OptionId("seo".to_string()))
                .collect::<BTreeSet<_>>(),
        }];
        let options = vec![
            OfferOption {
                id: OptionId("seo".to_string()),
                title: "Référencement".to_string(),
                slug: "seo".to_string(),
                pricing: Pricing::From { price_from_cents: 80_000 },
                duration_days: 4,
                rank: 1,
            },
            OfferOption {
                id: OptionId("maintenance".to_string()),
                title: "Maintenance annuelle".to_string(),
                slug: "maintenance".to_string(),
                pricing: Pricing::Fixed { price_cents: 20_000 },
                duration_days: 3,
                rank: 2,
            },
        ];
        InMemoryCatalogStore::new(offers, options)
    }

    fn service() -> (Service, Arc<InMemoryRequestStore>, RecordingNotifier) {
        let requests = Arc::new(InMemoryRequestStore::default());
        let notifier = RecordingNotifier::default();
        let service =
            QuoteService::new(Arc::new(catalog()), Arc::clone(&requests), notifier.clone());
        (service, requests, notifier)
    }

    fn admin() -> Caller {
        Caller::Authenticated(Identity {
            id: "u-1".to_string(),
            email: "studio@example.org".to_string(),
            is_admin: true,
        })
    }

    fn payload() -> QuotePayload {
        QuotePayload {
            first_name: Some("Nadia".to_string()),
            last_name: Some("Verne".to_string()),
            email: Some("nadia@example.org".to_string()),
            phone: Some("0612345678".to_string()),
            project_description: Some(
                "Refonte du site vitrine avec blog et prise de rendez-vous.".to_string(),
            ),
            desired_delivery_date: None,
            offer_id: Some("offre-vitrine".to_string()),
            options: vec![
                SelectionPayload { option_id: Some("seo".to_string()), quantity: Some(1) },
                SelectionPayload { option_id: Some("maintenance".to_string()), quantity: Some(2) },
            ],
            appointment: None,
        }
    }

    #[tokio::test]
    async fn submission_persists_computes_and_notifies() {
        let (service, requests, notifier) = service();

        let submitted = service
            .submit(&payload(), &Caller::Anonymous, now())
            .await
            .expect("valid submission");

        // seo is bundled: free, but its 4 days count. maintenance is FIXED:
        // quantity-invariant price, duration × 2.
        assert_eq!(submitted.aggregate.total_price_cents, Some(20_000));
        assert!(!submitted.aggregate.is_from_estimate);
        assert_eq!(submitted.aggregate.total_duration_days, 8 + 4 + 3 * 2);
        assert_eq!(submitted.quote.status, QuoteStatus::New);

        let stored = requests
            .find_quote(&submitted.quote.id)
            .await
            .expect("lookup")
            .expect("quote persisted");
        assert_eq!(stored.selections.len(), 2);

        assert_eq!(
            notifier.sent(),
            vec![Notification::QuoteReceived {
                quote_id: submitted.quote.id.0.clone(),
                email: "nadia@example.org".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn unknown_option_rejects_without_creating_anything() {
        let (service, requests, notifier) = service();
        let mut payload = payload();
        payload.options.push(SelectionPayload {
            option_id: Some("hebergement".to_string()),
            quantity: Some(1),
        });

        let error = service
            .submit(&payload, &Caller::Anonymous, now())
            .await
            .expect_err("unknown reference");

        match error {
            ApplicationError::Rejected(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "options[2].option_id");
                assert_eq!(errors[0].code, ErrorCode::UnknownReference);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(requests.list_quotes(None).await.expect("list").is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn submission_with_embedded_appointment_links_and_returns_the_token() {
        let (service, requests, _) = service();
        let mut payload = payload();
        payload.appointment = Some(AppointmentPayload {
            date: Some("2026-03-20".to_string()),
            time: Some("15:00".to_string()),
            reason: Some("Premier échange sur le projet".to_string()),
            details: None,
        });

        let submitted = service
            .submit(&payload, &Caller::Anonymous, now())
            .await
            .expect("valid submission");

        let token = submitted.appointment_token.expect("anonymous booking issues a token");
        assert!(submitted.quote.appointment_id.is_some());

        let pending = requests
            .find_appointment_by_token(&token)
            .await
            .expect("lookup")
            .expect("appointment persisted");
        assert_eq!(Some(pending.id), submitted.quote.appointment_id);
    }

    #[tokio::test]
    async fn identical_patches_recompute_the_same_aggregate() {
        let (service, _, _) = service();
        let submitted = service
            .submit(&payload(), &Caller::Anonymous, now())
            .await
            .expect("submission");

        let patch = vec![
            SelectionPayload { option_id: Some("maintenance".to_string()), quantity: Some(3) },
        ];
        let first = service
            .replace_options(&submitted.quote.id, &patch, &admin())
            .await
            .expect("first patch");
        let second = service
            .replace_options(&submitted.quote.id, &patch, &admin())
            .await
            .expect("second patch");

        assert_eq!(first.aggregate, second.aggregate);
        assert_eq!(first.quote.selections, second.quote.selections);
        // The old selection set is gone, not merged.
        assert_eq!(first.quote.selections.len(), 1);
    }

    #[tokio::test]
    async fn status_guard_distinguishes_its_three_rejections() {
        let (service, _, _) = service();
        let submitted = service
            .submit(&payload(), &Caller::Anonymous, now())
            .await
            .expect("submission");

        let anonymous = service
            .set_status(&submitted.quote.id, "SENT", &Caller::Anonymous)
            .await
            .expect_err("anonymous");
        assert_eq!(anonymous, ApplicationError::Access(AccessError::Unauthenticated));

        let customer = Caller::Authenticated(Identity {
            id: "u-17".to_string(),
            email: "nadia@example.org".to_string(),
            is_admin: false,
        });
        let forbidden = service
            .set_status(&submitted.quote.id, "SENT", &customer)
            .await
            .expect_err("not an admin");
        assert_eq!(forbidden, ApplicationError::Access(AccessError::Forbidden));

        let invalid = service
            .set_status(&submitted.quote.id, "ARCHIVED", &admin())
            .await
            .expect_err("outside the closed set");
        match invalid {
            ApplicationError::Rejected(errors) => {
                assert_eq!(errors[0].field, "status");
                assert_eq!(errors[0].code, ErrorCode::InvalidFormat);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let updated = service
            .set_status(&submitted.quote.id, "SENT", &admin())
            .await
            .expect("valid transition");
        assert_eq!(updated.status, QuoteStatus::Sent);

        // Backward moves stay available to admins.
        let back = service
            .set_status(&submitted.quote.id, "NEW", &admin())
            .await
            .expect("backward transition");
        assert_eq!(back.status, QuoteStatus::New);
    }

    #[tokio::test]
    async fn get_is_owner_or_admin_scoped() {
        let (service, _, _) = service();
        let submitted = service
            .submit(&payload(), &Caller::Anonymous, now())
            .await
            .expect("submission");

        let owner = Caller::Authenticated(Identity {
            id: "u-17".to_string(),
            email: "nadia@example.org".to_string(),
            is_admin: false,
        });
        let detail = service.get(&submitted.quote.id, &owner).await.expect("owner access");
        assert_eq!(detail.aggregate, submitted.aggregate);
        assert_eq!(detail.lines.len(), 2);

        let stranger = Caller::Authenticated(Identity {
            id: "u-99".to_string(),
            email: "other@example.org".to_string(),
            is_admin: false,
        });
        let error = service.get(&submitted.quote.id, &stranger).await.expect_err("stranger");
        assert_eq!(error, ApplicationError::Access(AccessError::Forbidden));
    }

    #[tokio::test]
    async fn delete_requires_admin_and_reports_missing_quotes() {
        let (service, requests, _) = service();
        let submitted = service
            .submit(&payload(), &Caller::Anonymous, now())
            .await
            .expect("submission");

        let error = service
            .delete(&submitted.quote.id, &Caller::Anonymous)
            .await
            .expect_err("anonymous delete");
        assert_eq!(error, ApplicationError::Access(AccessError::Unauthenticated));

        service.delete(&submitted.quote.id, &admin()).await.expect("admin delete");
        assert!(requests.list_quotes(None).await.expect("list").is_empty());

        let missing = service
            .delete(&submitted.quote.id, &admin())
            .await
            .expect_err("already deleted");
        assert_eq!(missing, ApplicationError::NotFound("quote"));
    }

    #[tokio::test]
    async fn list_filters_by_status_for_admins_only() {
        let (service, _, _) = service();
        let first = service
            .submit(&payload(), &Caller::Anonymous, now())
            .await
            .expect("first submission");
        service
            .set_status(&first.quote.id, "SENT", &admin())
            .await
            .expect("mark sent");
        service
            .submit(&payload(), &Caller::Anonymous, now())
            .await
            .expect("second submission");

        let sent = service
            .list(Some(QuoteStatus::Sent), &admin())
            .await
            .expect("admin list");
        assert_eq!(sent.len(), 1);

        let all = service.list(None, &admin()).await.expect("admin list all");
        assert_eq!(all.len(), 2);

        let error = service.list(None, &Caller::Anonymous).await.expect_err("anonymous list");
        assert_eq!(error, ApplicationError::Access(AccessError::Unauthenticated));
    }
}

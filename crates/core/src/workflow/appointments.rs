//! Appointment booking and the token-guarded confirmation path.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::appointment::{Appointment, PendingToken};
use crate::domain::caller::Caller;
use crate::errors::ApplicationError;
use crate::notify::Notifier;
use crate::stores::RequestStore;
use crate::validate::{validate_appointment, AppointmentPayload};

pub struct AppointmentService<R, N> {
    requests: R,
    notifier: N,
}

/// Booking outcome. The token is only present for anonymous bookings and
/// is shown exactly once — it cannot be recovered later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookedAppointment {
    pub appointment: Appointment,
    pub token: Option<PendingToken>,
}

impl<R, N> AppointmentService<R, N>
where
    R: RequestStore,
    N: Notifier,
{
    pub fn new(requests: R, notifier: N) -> Self {
        Self { requests, notifier }
    }

    /// Book a slot. Anonymous callers get a pending appointment behind a
    /// single-use token; authenticated callers are bound and confirmed
    /// immediately.
    pub async fn book(
        &self,
        payload: &AppointmentPayload,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<BookedAppointment, ApplicationError> {
        let slot = validate_appointment(payload, now).map_err(ApplicationError::Rejected)?;

        let appointment = match caller.identity() {
            None => Appointment::pending(slot.scheduled_at, slot.reason, slot.details, now),
            Some(identity) => Appointment::confirmed(
                slot.scheduled_at,
                slot.reason,
                slot.details,
                identity.email.clone(),
                now,
            ),
        };

        let created = self.requests.create_appointment(appointment).await?;
        if created.pending_token.is_none() {
            self.notifier.appointment_confirmed(&created).await;
        }

        Ok(BookedAppointment { token: created.pending_token.clone(), appointment: created })
    }

    /// Look up a still-pending booking, for the post-sign-in confirmation
    /// screen. Spent and unknown tokens read identically as absent.
    pub async fn find_pending(
        &self,
        token: &PendingToken,
    ) -> Result<Appointment, ApplicationError> {
        self.requests
            .find_appointment_by_token(token)
            .await?
            .ok_or(ApplicationError::NotFound("appointment"))
    }

    /// Complete an anonymous booking: atomically claim the token, bind the
    /// caller and confirm. The persisted transition is authoritative; the
    /// confirmation notification is a courtesy on top.
    pub async fn complete(
        &self,
        token: &PendingToken,
        caller: &Caller,
    ) -> Result<Appointment, ApplicationError> {
        let identity = caller.require_authenticated()?;

        let confirmed = self
            .requests
            .confirm_appointment_by_token(token, &identity.email)
            .await?
            .ok_or(ApplicationError::NotFound("appointment"))?;

        self.notifier.appointment_confirmed(&confirmed).await;
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::domain::appointment::AppointmentStatus;
    use crate::domain::caller::{AccessError, Caller, Identity};
    use crate::errors::ApplicationError;
    use crate::notify::{Notification, RecordingNotifier};
    use crate::stores::memory::InMemoryRequestStore;
    use crate::validate::{AppointmentPayload, ErrorCode};

    use super::AppointmentService;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).single().expect("fixed clock")
    }

    fn payload() -> AppointmentPayload {
        AppointmentPayload {
            date: Some("2026-03-20".to_string()),
            time: Some("15:00".to_string()),
            reason: Some("Premier échange sur le projet".to_string()),
            details: Some("De préférence en visio".to_string()),
        }
    }

    fn service() -> (
        AppointmentService<Arc<InMemoryRequestStore>, RecordingNotifier>,
        RecordingNotifier,
    ) {
        let notifier = RecordingNotifier::default();
        let service =
            AppointmentService::new(Arc::new(InMemoryRequestStore::default()), notifier.clone());
        (service, notifier)
    }

    fn customer() -> Caller {
        Caller::Authenticated(Identity {
            id: "u-17".to_string(),
            email: "client@example.org".to_string(),
            is_admin: false,
        })
    }

    #[tokio::test]
    async fn anonymous_booking_is_pending_and_silent() {
        let (service, notifier) = service();

        let booked = service
            .book(&payload(), &Caller::Anonymous, now())
            .await
            .expect("valid booking");

        assert_eq!(booked.appointment.status, AppointmentStatus::Pending);
        assert!(booked.token.is_some());
        // No confirmation goes out until the booking is claimed.
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn authenticated_booking_confirms_and_notifies_immediately() {
        let (service, notifier) = service();

        let booked = service
            .book(&payload(), &customer(), now())
            .await
            .expect("valid booking");

        assert_eq!(booked.appointment.status, AppointmentStatus::Confirmed);
        assert!(booked.token.is_none());
        assert_eq!(booked.appointment.user_email.as_deref(), Some("client@example.org"));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn past_slot_is_rejected_before_any_store_call() {
        let (service, notifier) = service();
        let stale = AppointmentPayload { date: Some("2026-03-09".to_string()), ..payload() };

        let error = service
            .book(&stale, &Caller::Anonymous, now())
            .await
            .expect_err("past slot");

        match error {
            ApplicationError::Rejected(errors) => {
                assert_eq!(errors[0].field, "date");
                assert_eq!(errors[0].code, ErrorCode::PastDate);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn completing_binds_confirms_and_notifies() {
        let (service, notifier) = service();
        let booked = service
            .book(&payload(), &Caller::Anonymous, now())
            .await
            .expect("booking");
        let token = booked.token.expect("token issued");

        let pending = service.find_pending(&token).await.expect("still pending");
        assert_eq!(pending.status, AppointmentStatus::Pending);

        let confirmed = service.complete(&token, &customer()).await.expect("claim");
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmed.user_email.as_deref(), Some("client@example.org"));
        assert!(confirmed.pending_token.is_none());

        assert_eq!(
            notifier.sent(),
            vec![Notification::AppointmentConfirmed {
                appointment_id: confirmed.id.0.clone(),
                email: Some("client@example.org".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn a_token_completes_exactly_once() {
        let (service, notifier) = service();
        let booked = service
            .book(&payload(), &Caller::Anonymous, now())
            .await
            .expect("booking");
        let token = booked.token.expect("token issued");

        let first = service.complete(&token, &customer()).await.expect("first claim");
        assert_eq!(first.status, AppointmentStatus::Confirmed);

        let other = Caller::Authenticated(Identity {
            id: "u-99".to_string(),
            email: "other@example.org".to_string(),
            is_admin: false,
        });
        let second = service.complete(&token, &other).await.expect_err("second claim");
        assert_eq!(second, ApplicationError::NotFound("appointment"));

        // The first binding stands; only one confirmation went out.
        assert_eq!(notifier.sent().len(), 1);
        let replay = service.find_pending(&token).await.expect_err("token is spent");
        assert_eq!(replay, ApplicationError::NotFound("appointment"));
    }

    #[tokio::test]
    async fn completion_requires_authentication() {
        let (service, _) = service();
        let booked = service
            .book(&payload(), &Caller::Anonymous, now())
            .await
            .expect("booking");
        let token = booked.token.expect("token issued");

        let error = service
            .complete(&token, &Caller::Anonymous)
            .await
            .expect_err("anonymous completion");
        assert_eq!(error, ApplicationError::Access(AccessError::Unauthenticated));
    }

    #[tokio::test]
    async fn unknown_and_spent_tokens_are_indistinguishable() {
        let (service, _) = service();
        let booked = service
            .book(&payload(), &Caller::Anonymous, now())
            .await
            .expect("booking");
        let token = booked.token.expect("token issued");
        service.complete(&token, &customer()).await.expect("claim");

        let spent = service.complete(&token, &customer()).await.expect_err("spent");
        let never_issued = service
            .complete(
                &crate::domain::appointment::PendingToken("never-issued".to_string()),
                &customer(),
            )
            .await
            .expect_err("unknown");

        assert_eq!(spent, never_issued);
    }
}

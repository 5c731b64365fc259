//! Outbound notification port. Dispatch is best-effort by contract:
//! implementations log and swallow their own failures, so a slow or
//! broken notifier can never fail or roll back the operation that
//! triggered it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::appointment::Appointment;
use crate::domain::quote::QuoteRequest;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn quote_received(&self, quote: &QuoteRequest);
    async fn appointment_confirmed(&self, appointment: &Appointment);
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn quote_received(&self, quote: &QuoteRequest) {
        (**self).quote_received(quote).await;
    }

    async fn appointment_confirmed(&self, appointment: &Appointment) {
        (**self).appointment_confirmed(appointment).await;
    }
}

/// Discards everything. Used when no notifier is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn quote_received(&self, _quote: &QuoteRequest) {}
    async fn appointment_confirmed(&self, _appointment: &Appointment) {}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    QuoteReceived { quote_id: String, email: String },
    AppointmentConfirmed { appointment_id: String, email: Option<String> },
}

/// Captures notifications for assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, notification: Notification) {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn quote_received(&self, quote: &QuoteRequest) {
        self.record(Notification::QuoteReceived {
            quote_id: quote.id.0.clone(),
            email: quote.contact.email.clone(),
        });
    }

    async fn appointment_confirmed(&self, appointment: &Appointment) {
        self.record(Notification::AppointmentConfirmed {
            appointment_id: appointment.id.0.clone(),
            email: appointment.user_email.clone(),
        });
    }
}

//! Webhook-backed confirmation dispatch. Best-effort by contract: every
//! failure is logged and swallowed here, so the persisted state change it
//! accompanies is never affected.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{info, warn};

use atelier_core::config::AppConfig;
use atelier_core::domain::appointment::Appointment;
use atelier_core::domain::quote::QuoteRequest;
use atelier_core::notify::{Notifier, NoopNotifier};

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, secret: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), url, secret }
    }

    async fn dispatch(&self, event: &str, payload: serde_json::Value) {
        let mut request = self.client.post(&self.url).json(&json!({
            "event": event,
            "payload": payload,
        }));
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!(event_name = "notify.webhook.delivered", event, "notification delivered");
            }
            Ok(response) => {
                warn!(
                    event_name = "notify.webhook.rejected",
                    event,
                    status = %response.status(),
                    "notification endpoint rejected the event"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "notify.webhook.failed",
                    event,
                    error = %error,
                    "notification delivery failed"
                );
            }
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn quote_received(&self, quote: &QuoteRequest) {
        self.dispatch(
            "quote.received",
            json!({
                "quote_id": quote.id.0,
                "email": quote.contact.email,
                "name": quote.contact.display_name(),
                "status": quote.status.as_str(),
            }),
        )
        .await;
    }

    async fn appointment_confirmed(&self, appointment: &Appointment) {
        self.dispatch(
            "appointment.confirmed",
            json!({
                "appointment_id": appointment.id.0,
                "email": appointment.user_email,
                "scheduled_at": appointment.scheduled_at.to_rfc3339(),
                "reason": appointment.reason,
            }),
        )
        .await;
    }
}

/// Build the notifier the configuration asks for: webhook when an
/// endpoint is configured, otherwise a no-op.
pub fn from_config(config: &AppConfig) -> Arc<dyn Notifier> {
    match &config.notifier.webhook_url {
        Some(url) => {
            info!(event_name = "notify.webhook.enabled", url = %url, "webhook notifier enabled");
            Arc::new(WebhookNotifier::new(
                url.clone(),
                config.notifier.secret.as_ref().map(|secret| secret.expose_secret().to_string()),
            ))
        }
        None => {
            info!(event_name = "notify.webhook.disabled", "no notifier configured");
            Arc::new(NoopNotifier)
        }
    }
}

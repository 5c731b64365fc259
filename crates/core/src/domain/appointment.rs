use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub String);

impl AppointmentId {
    pub fn generate() -> Self {
        Self(format!("RDV-{}", &Uuid::new_v4().simple().to_string()[..12]))
    }
}

/// Single-use credential binding an anonymous booking to a later
/// authenticated confirmation. Cleared the first time it is presented.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingToken(pub String);

impl PendingToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not one of PENDING|CONFIRMED")]
pub struct UnknownAppointmentStatus(pub String);

impl std::str::FromStr for AppointmentStatus {
    type Err = UnknownAppointmentStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            other => Err(UnknownAppointmentStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub details: Option<String>,
    pub status: AppointmentStatus,
    pub pending_token: Option<PendingToken>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Anonymous booking: no identity yet, a fresh single-use token, and
    /// status `Pending` until the token is presented by an authenticated
    /// caller.
    pub fn pending(
        scheduled_at: DateTime<Utc>,
        reason: String,
        details: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AppointmentId::generate(),
            scheduled_at,
            reason,
            details,
            status: AppointmentStatus::Pending,
            pending_token: Some(PendingToken::generate()),
            user_email: None,
            created_at: now,
        }
    }

    /// Authenticated booking: bound to the caller immediately, no token.
    pub fn confirmed(
        scheduled_at: DateTime<Utc>,
        reason: String,
        details: Option<String>,
        user_email: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AppointmentId::generate(),
            scheduled_at,
            reason,
            details,
            status: AppointmentStatus::Confirmed,
            pending_token: None,
            user_email: Some(user_email),
            created_at: now,
        }
    }

    /// Bind a pending appointment to an identity: flips the status, records
    /// the email, and consumes the token. Only valid while the token is
    /// still set.
    pub fn confirm_for(&mut self, user_email: &str) -> Result<(), DomainError> {
        if self.status != AppointmentStatus::Pending || self.pending_token.is_none() {
            return Err(DomainError::AppointmentNotPending { status: self.status });
        }
        self.status = AppointmentStatus::Confirmed;
        self.user_email = Some(user_email.to_string());
        self.pending_token = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::errors::DomainError;

    use super::{Appointment, AppointmentStatus};

    fn pending_appointment() -> Appointment {
        let now = Utc::now();
        Appointment::pending(
            now + Duration::days(7),
            "Cadrage du projet".to_string(),
            Some("Visio de 30 minutes".to_string()),
            now,
        )
    }

    #[test]
    fn pending_booking_carries_a_token_and_no_identity() {
        let appointment = pending_appointment();
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert!(appointment.pending_token.is_some());
        assert!(appointment.user_email.is_none());
    }

    #[test]
    fn confirm_binds_identity_and_consumes_the_token() {
        let mut appointment = pending_appointment();
        appointment.confirm_for("nadia@example.org").expect("first confirm");

        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(appointment.user_email.as_deref(), Some("nadia@example.org"));
        assert!(appointment.pending_token.is_none());

        let error = appointment.confirm_for("other@example.org").expect_err("second confirm");
        assert!(matches!(
            error,
            DomainError::AppointmentNotPending { status: AppointmentStatus::Confirmed }
        ));
        // First binding is untouched by the failed replay.
        assert_eq!(appointment.user_email.as_deref(), Some("nadia@example.org"));
    }

    #[test]
    fn authenticated_booking_is_confirmed_without_a_token() {
        let now = Utc::now();
        let appointment = Appointment::confirmed(
            now + Duration::days(2),
            "Point d'avancement".to_string(),
            None,
            "client@example.org".to_string(),
            now,
        );
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert!(appointment.pending_token.is_none());
        assert_eq!(appointment.user_email.as_deref(), Some("client@example.org"));
    }

    #[test]
    fn generated_tokens_are_unique() {
        let first = pending_appointment();
        let second = pending_appointment();
        assert_ne!(first.pending_token, second.pending_token);
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::appointment::AppointmentId;
use crate::domain::catalog::{OfferId, OptionId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(format!("QR-{}", &Uuid::new_v4().simple().to_string()[..12]))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    New,
    Sent,
    Reviewed,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not one of NEW|SENT|REVIEWED")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for QuoteStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "NEW" => Ok(Self::New),
            "SENT" => Ok(Self::Sent),
            "REVIEWED" => Ok(Self::Reviewed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Sent => "SENT",
            Self::Reviewed => "REVIEWED",
        }
    }
}

/// One selected catalog option with its quantity (>= 1). Order is
/// preserved from the submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub option_id: OptionId,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

impl Contact {
    /// Customer display name, falling back to the email address when no
    /// name was provided.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

/// A customer quote request. Created by the public wizard with status
/// `New`; the option set is only ever replaced wholesale, never merged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id: QuoteId,
    pub contact: Contact,
    pub project_description: String,
    pub desired_delivery_date: Option<NaiveDate>,
    pub offer_id: Option<OfferId>,
    pub selections: Vec<Selection>,
    pub status: QuoteStatus,
    pub appointment_id: Option<AppointmentId>,
    pub created_at: DateTime<Utc>,
}

impl QuoteRequest {
    /// Any target inside the closed status set is accepted, including
    /// backward moves (an admin may send a reviewed quote back to NEW).
    /// Values outside the set never reach this point: they fail at parse.
    pub fn set_status(&mut self, next: QuoteStatus) {
        self.status = next;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::catalog::OptionId;

    use super::{Contact, QuoteId, QuoteRequest, QuoteStatus, Selection};

    fn quote(status: QuoteStatus) -> QuoteRequest {
        QuoteRequest {
            id: QuoteId("QR-1".to_string()),
            contact: Contact {
                first_name: Some("Nadia".to_string()),
                last_name: Some("Verne".to_string()),
                email: "nadia@example.org".to_string(),
                phone: None,
            },
            project_description: "Refonte complète du site vitrine et du blog.".to_string(),
            desired_delivery_date: None,
            offer_id: None,
            selections: vec![Selection { option_id: OptionId("seo".to_string()), quantity: 1 }],
            status,
            appointment_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_parse_is_a_closed_set() {
        assert_eq!("NEW".parse::<QuoteStatus>().expect("new"), QuoteStatus::New);
        assert_eq!("SENT".parse::<QuoteStatus>().expect("sent"), QuoteStatus::Sent);
        assert_eq!("REVIEWED".parse::<QuoteStatus>().expect("reviewed"), QuoteStatus::Reviewed);
        let error = "ARCHIVED".parse::<QuoteStatus>().expect_err("archived must fail");
        assert_eq!(error.0, "ARCHIVED");
    }

    #[test]
    fn backward_status_moves_are_permitted() {
        let mut quote = quote(QuoteStatus::Reviewed);
        quote.set_status(QuoteStatus::New);
        assert_eq!(quote.status, QuoteStatus::New);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut contact = quote(QuoteStatus::New).contact;
        assert_eq!(contact.display_name(), "Nadia Verne");
        contact.first_name = None;
        contact.last_name = None;
        assert_eq!(contact.display_name(), "nadia@example.org");
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{OptionId, ServiceOffer};
use crate::domain::quote::Selection;

/// Ordered steps of the public quote wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardStep {
    Contact,
    Offer,
    Options,
    Review,
}

impl WizardStep {
    pub fn first() -> Self {
        Self::Contact
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Contact => Some(Self::Offer),
            Self::Offer => Some(Self::Options),
            Self::Options => Some(Self::Review),
            Self::Review => None,
        }
    }

    pub fn previous(&self) -> Option<Self> {
        match self {
            Self::Contact => None,
            Self::Offer => Some(Self::Contact),
            Self::Options => Some(Self::Offer),
            Self::Review => Some(Self::Options),
        }
    }
}

/// Everything the visitor has entered so far. Free-text fields stay raw
/// strings; full normalization happens at submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub offer: Option<ServiceOffer>,
    pub selections: Vec<Selection>,
    pub project_description: Option<String>,
    pub desired_delivery_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardEvent {
    SetContact {
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    },
    /// Selecting an offer pre-selects its bundled options as locked
    /// entries; clearing or switching the offer reconciles them.
    ChooseOffer { offer: Option<ServiceOffer> },
    ToggleOption { option_id: OptionId },
    SetQuantity { option_id: OptionId, quantity: u32 },
    SetDescription { text: String },
    SetDeliveryDate { date: Option<String> },
    Next,
    Back,
    Restart,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub step: WizardStep,
    pub form: WizardForm,
    /// Anonymous visitors must provide their full identity on the contact
    /// step; signed-in customers only need a reachable email.
    pub require_full_identity: bool,
}

impl WizardState {
    pub fn new(require_full_identity: bool) -> Self {
        Self {
            step: WizardStep::first(),
            form: WizardForm::default(),
            require_full_identity,
        }
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new(true)
    }
}

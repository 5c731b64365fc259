use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionId(pub String);

/// Pricing model of a catalog option. Each variant carries exactly the
/// fields its model requires, so a constructed value cannot mix field-sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pricing {
    Fixed { price_cents: i64 },
    From { price_from_cents: i64 },
    PerUnit { unit_label: String, unit_price_cents: i64 },
    QuoteOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingKind {
    Fixed,
    From,
    PerUnit,
    QuoteOnly,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingFieldsError {
    #[error("pricing type `{0}` is not one of FIXED|FROM|PER_UNIT|QUOTE_ONLY")]
    UnknownKind(String),
    #[error("pricing fields do not match declared type {kind:?}: {detail}")]
    Mismatch { kind: PricingKind, detail: String },
}

impl std::str::FromStr for PricingKind {
    type Err = PricingFieldsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "FIXED" => Ok(Self::Fixed),
            "FROM" => Ok(Self::From),
            "PER_UNIT" => Ok(Self::PerUnit),
            "QUOTE_ONLY" => Ok(Self::QuoteOnly),
            other => Err(PricingFieldsError::UnknownKind(other.to_string())),
        }
    }
}

impl PricingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "FIXED",
            Self::From => "FROM",
            Self::PerUnit => "PER_UNIT",
            Self::QuoteOnly => "QUOTE_ONLY",
        }
    }
}

impl Pricing {
    pub fn kind(&self) -> PricingKind {
        match self {
            Self::Fixed { .. } => PricingKind::Fixed,
            Self::From { .. } => PricingKind::From,
            Self::PerUnit { .. } => PricingKind::PerUnit,
            Self::QuoteOnly => PricingKind::QuoteOnly,
        }
    }

    /// Assemble a `Pricing` from the flat column/field representation used
    /// by payloads and storage rows. Exactly the fields required by `kind`
    /// must be populated; anything else is a mismatch, reported rather than
    /// silently dropped.
    pub fn from_parts(
        kind: PricingKind,
        price_cents: Option<i64>,
        price_from_cents: Option<i64>,
        unit_label: Option<String>,
        unit_price_cents: Option<i64>,
    ) -> Result<Self, PricingFieldsError> {
        let mismatch = |detail: &str| PricingFieldsError::Mismatch {
            kind,
            detail: detail.to_string(),
        };

        match kind {
            PricingKind::Fixed => {
                if price_from_cents.is_some() || unit_label.is_some() || unit_price_cents.is_some()
                {
                    return Err(mismatch("FIXED accepts only price_cents"));
                }
                let price_cents =
                    price_cents.ok_or_else(|| mismatch("FIXED requires price_cents"))?;
                Ok(Self::Fixed { price_cents })
            }
            PricingKind::From => {
                if price_cents.is_some() || unit_label.is_some() || unit_price_cents.is_some() {
                    return Err(mismatch("FROM accepts only price_from_cents"));
                }
                let price_from_cents =
                    price_from_cents.ok_or_else(|| mismatch("FROM requires price_from_cents"))?;
                Ok(Self::From { price_from_cents })
            }
            PricingKind::PerUnit => {
                if price_cents.is_some() || price_from_cents.is_some() {
                    return Err(mismatch("PER_UNIT accepts only unit_label and unit_price_cents"));
                }
                let unit_label =
                    unit_label.ok_or_else(|| mismatch("PER_UNIT requires unit_label"))?;
                let unit_price_cents = unit_price_cents
                    .ok_or_else(|| mismatch("PER_UNIT requires unit_price_cents"))?;
                Ok(Self::PerUnit { unit_label, unit_price_cents })
            }
            PricingKind::QuoteOnly => {
                if price_cents.is_some()
                    || price_from_cents.is_some()
                    || unit_label.is_some()
                    || unit_price_cents.is_some()
                {
                    return Err(mismatch("QUOTE_ONLY accepts no pricing fields"));
                }
                Ok(Self::QuoteOnly)
            }
        }
    }

    /// Customer-facing price string, e.g. "1200 €", "à partir de 800 €",
    /// "120 € / page", "sur devis".
    pub fn display_label(&self) -> String {
        match self {
            Self::Fixed { price_cents } => format!("{} €", format_cents(*price_cents)),
            Self::From { price_from_cents } => {
                format!("à partir de {} €", format_cents(*price_from_cents))
            }
            Self::PerUnit { unit_label, unit_price_cents } => {
                format!("{} € / {unit_label}", format_cents(*unit_price_cents))
            }
            Self::QuoteOnly => "sur devis".to_string(),
        }
    }
}

/// Render integer cents as a decimal euro amount with a comma separator,
/// omitting the fraction when whole ("1200" rather than "1200,00").
pub fn format_cents(cents: i64) -> String {
    let amount = Decimal::new(cents, 2).normalize();
    amount.to_string().replace('.', ",")
}

/// A purchasable add-on from the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferOption {
    pub id: OptionId,
    pub title: String,
    pub slug: String,
    pub pricing: Pricing,
    pub duration_days: u32,
    pub rank: i64,
}

/// A base service package. `price_label` is display-only; computed totals
/// come from the selected options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffer {
    pub id: OfferId,
    pub slug: String,
    pub title: String,
    pub price_label: String,
    pub duration_days: u32,
    pub included_option_ids: BTreeSet<OptionId>,
}

impl ServiceOffer {
    pub fn includes(&self, option_id: &OptionId) -> bool {
        self.included_option_ids.contains(option_id)
    }
}

//! Price and duration aggregation over an offer + option selection.
//!
//! All money values are integer cents; the only place a customer-facing
//! total is computed. Options bundled with the offer contribute no price
//! but their durations still count.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{OfferOption, OptionId, Pricing, ServiceOffer};

/// Computed totals for one offer + selection combination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Displayable total. `None` when any selected extra is quote-only —
    /// the numeric sum is then meaningless for the customer but survives
    /// in `subtotal_cents` for the admin view.
    pub total_price_cents: Option<i64>,
    /// Numeric sum of all priced contributions, always retained.
    pub subtotal_cents: i64,
    /// At least one contribution is a lower bound ("from" pricing), so
    /// the total reads "from X" rather than "X".
    pub is_from_estimate: bool,
    /// At least one selected extra is priced on quotation only.
    pub requires_quote: bool,
    pub total_duration_days: u32,
}

/// Per-option contribution, for the admin breakdown of a quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineContribution {
    pub option_id: OptionId,
    pub title: String,
    pub quantity: u32,
    pub included: bool,
    /// `None` for quote-only extras; `Some(0)` for included options.
    pub amount_cents: Option<i64>,
    pub duration_days: u32,
}

/// Compute the aggregate for a selection. `selections` preserves
/// submission order; quantities have already been validated (>= 1).
pub fn aggregate(offer: Option<&ServiceOffer>, selections: &[(OfferOption, u32)]) -> Aggregate {
    let (aggregate, _) = aggregate_with_breakdown(offer, selections);
    aggregate
}

/// Same computation, also yielding the per-line breakdown.
pub fn aggregate_with_breakdown(
    offer: Option<&ServiceOffer>,
    selections: &[(OfferOption, u32)],
) -> (Aggregate, Vec<LineContribution>) {
    let mut subtotal_cents: i64 = 0;
    let mut is_from_estimate = false;
    let mut requires_quote = false;
    let mut total_duration_days: u32 = offer.map(|offer| offer.duration_days).unwrap_or(0);
    let mut lines = Vec::with_capacity(selections.len());

    for (option, quantity) in selections {
        let quantity = *quantity;
        let included = offer.is_some_and(|offer| offer.includes(&option.id));

        // Duration is additive for every selection, included or not.
        total_duration_days += option.duration_days * quantity;

        let amount_cents = if included {
            Some(0)
        } else {
            match &option.pricing {
                // Fixed prices do not scale with quantity; only per-unit
                // pricing multiplies.
                Pricing::Fixed { price_cents } => Some(*price_cents),
                Pricing::From { price_from_cents } => {
                    is_from_estimate = true;
                    Some(*price_from_cents)
                }
                Pricing::PerUnit { unit_price_cents, .. } => {
                    Some(unit_price_cents * i64::from(quantity))
                }
                Pricing::QuoteOnly => {
                    requires_quote = true;
                    None
                }
            }
        };

        subtotal_cents += amount_cents.unwrap_or(0);

        lines.push(LineContribution {
            option_id: option.id.clone(),
            title: option.title.clone(),
            quantity,
            included,
            amount_cents,
            duration_days: option.duration_days * quantity,
        });
    }

    let aggregate = Aggregate {
        total_price_cents: if requires_quote { None } else { Some(subtotal_cents) },
        subtotal_cents,
        is_from_estimate,
        requires_quote,
        total_duration_days,
    };

    (aggregate, lines)
}

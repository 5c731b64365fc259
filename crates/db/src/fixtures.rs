//! Development seed data: a small realistic catalog the public wizard can
//! run against. Payloads go through the same validation as admin catalog
//! submissions, so a typo in a fixture fails loudly rather than planting
//! an inconsistent row.

use atelier_core::validate::{validate_option, OptionPayload};
use thiserror::Error;
use tracing::info;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("fixture option `{slug}` is invalid: {detail}")]
    InvalidFixture { slug: String, detail: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub offers: u32,
    pub options: u32,
}

struct OfferFixture {
    slug: &'static str,
    title: &'static str,
    price_label: &'static str,
    duration_days: i64,
    included: &'static [&'static str],
}

fn option_fixtures() -> Vec<OptionPayload> {
    let entry = |title: &str,
                 slug: &str,
                 pricing_type: &str,
                 duration_days: i64,
                 rank: i64| OptionPayload {
        title: Some(title.to_string()),
        slug: Some(slug.to_string()),
        pricing_type: Some(pricing_type.to_string()),
        duration_days: Some(duration_days),
        rank: Some(rank),
        ..OptionPayload::default()
    };

    vec![
        OptionPayload {
            price_from_cents: Some(80_000),
            ..entry("Référencement naturel", "seo", "FROM", 4, 1)
        },
        OptionPayload {
            price_cents: Some(20_000),
            ..entry("Maintenance annuelle", "maintenance", "FIXED", 3, 2)
        },
        OptionPayload {
            unit_label: Some("page".to_string()),
            unit_price_cents: Some(12_000),
            ..entry("Rédaction de contenu", "redaction", "PER_UNIT", 1, 3)
        },
        OptionPayload {
            price_cents: Some(45_000),
            ..entry("Identité visuelle", "identite-visuelle", "FIXED", 5, 4)
        },
        entry("Application métier sur mesure", "app-metier", "QUOTE_ONLY", 30, 5),
    ]
}

const OFFER_FIXTURES: &[OfferFixture] = &[
    OfferFixture {
        slug: "offre-vitrine",
        title: "Site vitrine",
        price_label: "à partir de 1900 €",
        duration_days: 8,
        included: &["seo"],
    },
    OfferFixture {
        slug: "offre-boutique",
        title: "Boutique en ligne",
        price_label: "à partir de 3900 €",
        duration_days: 20,
        included: &["seo", "maintenance"],
    },
];

/// Install the demo catalog. Idempotent: an already-seeded database is
/// left untouched.
pub async fn seed_catalog(pool: &DbPool) -> Result<SeedSummary, SeedError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM offer_option")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!(event_name = "db.fixtures.skipped", existing, "catalog already seeded");
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();

    for payload in option_fixtures() {
        let slug = payload.slug.clone().unwrap_or_default();
        let option = validate_option(&payload).map_err(|errors| SeedError::InvalidFixture {
            slug: slug.clone(),
            detail: errors
                .iter()
                .map(|error| format!("{}: {}", error.field, error.message))
                .collect::<Vec<_>>()
                .join("; "),
        })?;

        let (price_cents, price_from_cents, unit_label, unit_price_cents) =
            match &option.pricing {
                atelier_core::Pricing::Fixed { price_cents } => {
                    (Some(*price_cents), None, None, None)
                }
                atelier_core::Pricing::From { price_from_cents } => {
                    (None, Some(*price_from_cents), None, None)
                }
                atelier_core::Pricing::PerUnit { unit_label, unit_price_cents } => {
                    (None, None, Some(unit_label.clone()), Some(*unit_price_cents))
                }
                atelier_core::Pricing::QuoteOnly => (None, None, None, None),
            };

        sqlx::query(
            "INSERT INTO offer_option
                (id, slug, title, pricing_type, price_cents, price_from_cents,
                 unit_label, unit_price_cents, duration_days, rank)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&option.slug)
        .bind(&option.slug)
        .bind(&option.title)
        .bind(option.pricing.kind().as_str())
        .bind(price_cents)
        .bind(price_from_cents)
        .bind(unit_label)
        .bind(unit_price_cents)
        .bind(i64::from(option.duration_days))
        .bind(option.rank)
        .execute(pool)
        .await?;
        summary.options += 1;
    }

    for offer in OFFER_FIXTURES {
        sqlx::query(
            "INSERT INTO service_offer (id, slug, title, price_label, duration_days)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(offer.slug)
        .bind(offer.slug)
        .bind(offer.title)
        .bind(offer.price_label)
        .bind(offer.duration_days)
        .execute(pool)
        .await?;

        for option_id in offer.included {
            sqlx::query(
                "INSERT INTO offer_included_option (offer_id, option_id) VALUES (?, ?)",
            )
            .bind(offer.slug)
            .bind(option_id)
            .execute(pool)
            .await?;
        }
        summary.offers += 1;
    }

    info!(
        event_name = "db.fixtures.seeded",
        offers = summary.offers,
        options = summary.options,
        "demo catalog installed"
    );
    Ok(summary)
}

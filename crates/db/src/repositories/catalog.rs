use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::Row;

use atelier_core::domain::catalog::{
    OfferId, OfferOption, OptionId, Pricing, PricingKind, ServiceOffer,
};
use atelier_core::stores::{CatalogStore, StoreError};

use super::{db_error, decode_error};
use crate::DbPool;

pub struct SqlCatalogStore {
    pool: DbPool,
}

impl SqlCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn included_option_ids(
        &self,
        offer_id: &str,
    ) -> Result<BTreeSet<OptionId>, StoreError> {
        let rows = sqlx::query(
            "SELECT option_id FROM offer_included_option WHERE offer_id = ? ORDER BY option_id",
        )
        .bind(offer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| {
                row.try_get::<String, _>("option_id").map(OptionId).map_err(decode_error)
            })
            .collect()
    }
}

fn decode_offer(
    row: &sqlx::sqlite::SqliteRow,
    included_option_ids: BTreeSet<OptionId>,
) -> Result<ServiceOffer, StoreError> {
    Ok(ServiceOffer {
        id: OfferId(row.try_get("id").map_err(decode_error)?),
        slug: row.try_get("slug").map_err(decode_error)?,
        title: row.try_get("title").map_err(decode_error)?,
        price_label: row.try_get("price_label").map_err(decode_error)?,
        duration_days: row.try_get::<i64, _>("duration_days").map_err(decode_error)? as u32,
        included_option_ids,
    })
}

/// Decode an option row, re-checking the pricing field-set invariant a
/// hand-edited row could have broken.
fn decode_option(row: &sqlx::sqlite::SqliteRow) -> Result<OfferOption, StoreError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let kind: String = row.try_get("pricing_type").map_err(decode_error)?;
    let kind: PricingKind = kind.parse().map_err(decode_error)?;

    let pricing = Pricing::from_parts(
        kind,
        row.try_get("price_cents").map_err(decode_error)?,
        row.try_get("price_from_cents").map_err(decode_error)?,
        row.try_get("unit_label").map_err(decode_error)?,
        row.try_get("unit_price_cents").map_err(decode_error)?,
    )
    .map_err(|mismatch| decode_error(format!("option `{id}`: {mismatch}")))?;

    Ok(OfferOption {
        id: OptionId(id),
        title: row.try_get("title").map_err(decode_error)?,
        slug: row.try_get("slug").map_err(decode_error)?,
        pricing,
        duration_days: row.try_get::<i64, _>("duration_days").map_err(decode_error)? as u32,
        rank: row.try_get("rank").map_err(decode_error)?,
    })
}

#[async_trait]
impl CatalogStore for SqlCatalogStore {
    async fn find_offer(&self, id: &OfferId) -> Result<Option<ServiceOffer>, StoreError> {
        let row = sqlx::query(
            "SELECT id, slug, title, price_label, duration_days FROM service_offer WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            None => Ok(None),
            Some(row) => {
                let included = self.included_option_ids(&id.0).await?;
                Ok(Some(decode_offer(&row, included)?))
            }
        }
    }

    async fn find_option(&self, id: &OptionId) -> Result<Option<OfferOption>, StoreError> {
        let row = sqlx::query(
            "SELECT id, slug, title, pricing_type, price_cents, price_from_cents,
                    unit_label, unit_price_cents, duration_days, rank
             FROM offer_option WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(decode_option).transpose()
    }

    async fn list_offers(&self) -> Result<Vec<ServiceOffer>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, slug, title, price_label, duration_days
             FROM service_offer ORDER BY slug",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut offers = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id").map_err(decode_error)?;
            let included = self.included_option_ids(&id).await?;
            offers.push(decode_offer(row, included)?);
        }
        Ok(offers)
    }

    async fn list_options(&self) -> Result<Vec<OfferOption>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, slug, title, pricing_type, price_cents, price_from_cents,
                    unit_label, unit_price_cents, duration_days, rank
             FROM offer_option ORDER BY rank, slug",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(decode_option).collect()
    }
}

#[cfg(test)]
mod tests {
    use atelier_core::domain::catalog::{OfferId, OptionId, Pricing};
    use atelier_core::stores::CatalogStore;

    use crate::{connect_with_settings, migrations};

    use super::SqlCatalogStore;

    async fn setup() -> crate::DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        sqlx::query(
            "INSERT INTO offer_option
                (id, slug, title, pricing_type, price_cents, duration_days, rank)
             VALUES ('maintenance', 'maintenance', 'Maintenance annuelle', 'FIXED', 20000, 3, 2)",
        )
        .execute(&pool)
        .await
        .expect("seed fixed option");

        sqlx::query(
            "INSERT INTO offer_option
                (id, slug, title, pricing_type, price_from_cents, duration_days, rank)
             VALUES ('seo', 'seo', 'Référencement', 'FROM', 80000, 4, 1)",
        )
        .execute(&pool)
        .await
        .expect("seed from option");

        sqlx::query(
            "INSERT INTO service_offer (id, slug, title, price_label, duration_days)
             VALUES ('offre-vitrine', 'offre-vitrine', 'Site vitrine', 'à partir de 1900 €', 8)",
        )
        .execute(&pool)
        .await
        .expect("seed offer");

        sqlx::query(
            "INSERT INTO offer_included_option (offer_id, option_id)
             VALUES ('offre-vitrine', 'seo')",
        )
        .execute(&pool)
        .await
        .expect("seed inclusion");

        pool
    }

    #[tokio::test]
    async fn offers_come_back_with_their_included_option_ids() {
        let store = SqlCatalogStore::new(setup().await);

        let offer = store
            .find_offer(&OfferId("offre-vitrine".to_string()))
            .await
            .expect("query")
            .expect("offer exists");

        assert_eq!(offer.duration_days, 8);
        assert!(offer.includes(&OptionId("seo".to_string())));
        assert!(!offer.includes(&OptionId("maintenance".to_string())));
    }

    #[tokio::test]
    async fn options_decode_into_their_pricing_variants() {
        let store = SqlCatalogStore::new(setup().await);

        let fixed = store
            .find_option(&OptionId("maintenance".to_string()))
            .await
            .expect("query")
            .expect("option exists");
        assert_eq!(fixed.pricing, Pricing::Fixed { price_cents: 20_000 });

        let listed = store.list_options().await.expect("list");
        // rank ordering: seo (1) before maintenance (2).
        assert_eq!(listed[0].id, OptionId("seo".to_string()));
        assert_eq!(listed[0].pricing, Pricing::From { price_from_cents: 80_000 });
    }

    #[tokio::test]
    async fn a_row_with_mixed_pricing_fields_is_a_decode_error() {
        let pool = setup().await;
        sqlx::query(
            "INSERT INTO offer_option
                (id, slug, title, pricing_type, price_cents, unit_price_cents, duration_days)
             VALUES ('broken', 'broken', 'Broken', 'FIXED', 1000, 500, 0)",
        )
        .execute(&pool)
        .await
        .expect("seed broken row");

        let store = SqlCatalogStore::new(pool);
        let error = store
            .find_option(&OptionId("broken".to_string()))
            .await
            .expect_err("mixed field-sets must not decode");
        assert!(matches!(error, atelier_core::stores::StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn missing_ids_read_as_none() {
        let store = SqlCatalogStore::new(setup().await);
        assert!(store
            .find_offer(&OfferId("missing".to_string()))
            .await
            .expect("query")
            .is_none());
        assert!(store
            .find_option(&OptionId("missing".to_string()))
            .await
            .expect("query")
            .is_none());
    }
}

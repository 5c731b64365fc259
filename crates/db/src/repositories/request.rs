use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;

use atelier_core::domain::appointment::{
    Appointment, AppointmentId, AppointmentStatus, PendingToken,
};
use atelier_core::domain::catalog::{OfferId, OptionId};
use atelier_core::domain::quote::{
    Contact, QuoteId, QuoteRequest, QuoteStatus, Selection,
};
use atelier_core::stores::{RequestStore, StoreError};

use super::{db_error, decode_error};
use crate::DbPool;

pub struct SqlRequestStore {
    pool: DbPool,
}

impl SqlRequestStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn selections_for(&self, quote_id: &str) -> Result<Vec<Selection>, StoreError> {
        let rows = sqlx::query(
            "SELECT option_id, quantity FROM quote_request_option
             WHERE quote_id = ? ORDER BY position",
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(Selection {
                    option_id: OptionId(row.try_get("option_id").map_err(decode_error)?),
                    quantity: row.try_get::<i64, _>("quantity").map_err(decode_error)? as u32,
                })
            })
            .collect()
    }

    async fn quote_with_selections(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<QuoteRequest, StoreError> {
        let id: String = row.try_get("id").map_err(decode_error)?;
        let selections = self.selections_for(&id).await?;
        decode_quote(row, selections)
    }
}

fn decode_quote(
    row: &sqlx::sqlite::SqliteRow,
    selections: Vec<Selection>,
) -> Result<QuoteRequest, StoreError> {
    let status: String = row.try_get("status").map_err(decode_error)?;
    let desired: Option<String> =
        row.try_get("desired_delivery_date").map_err(decode_error)?;

    Ok(QuoteRequest {
        id: QuoteId(row.try_get("id").map_err(decode_error)?),
        contact: Contact {
            first_name: row.try_get("first_name").map_err(decode_error)?,
            last_name: row.try_get("last_name").map_err(decode_error)?,
            email: row.try_get("email").map_err(decode_error)?,
            phone: row.try_get("phone").map_err(decode_error)?,
        },
        project_description: row.try_get("project_description").map_err(decode_error)?,
        desired_delivery_date: desired
            .map(|value| NaiveDate::parse_from_str(&value, "%Y-%m-%d"))
            .transpose()
            .map_err(decode_error)?,
        offer_id: row
            .try_get::<Option<String>, _>("offer_id")
            .map_err(decode_error)?
            .map(OfferId),
        selections,
        status: status.parse::<QuoteStatus>().map_err(decode_error)?,
        appointment_id: row
            .try_get::<Option<String>, _>("appointment_id")
            .map_err(decode_error)?
            .map(AppointmentId),
        created_at: decode_instant(row, "created_at")?,
    })
}

fn decode_appointment(row: &sqlx::sqlite::SqliteRow) -> Result<Appointment, StoreError> {
    let status: String = row.try_get("status").map_err(decode_error)?;

    Ok(Appointment {
        id: AppointmentId(row.try_get("id").map_err(decode_error)?),
        scheduled_at: decode_instant(row, "scheduled_at")?,
        reason: row.try_get("reason").map_err(decode_error)?,
        details: row.try_get("details").map_err(decode_error)?,
        status: status.parse::<AppointmentStatus>().map_err(decode_error)?,
        pending_token: row
            .try_get::<Option<String>, _>("pending_token")
            .map_err(decode_error)?
            .map(PendingToken),
        user_email: row.try_get("user_email").map_err(decode_error)?,
        created_at: decode_instant(row, "created_at")?,
    })
}

fn decode_instant(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, StoreError> {
    let value: String = row.try_get(column).map_err(decode_error)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|error| decode_error(format!("column `{column}`: {error}")))
}

const QUOTE_COLUMNS: &str = "id, first_name, last_name, email, phone, project_description,
    desired_delivery_date, offer_id, status, appointment_id, created_at";

const APPOINTMENT_COLUMNS: &str =
    "id, scheduled_at, reason, details, status, pending_token, user_email, created_at";

#[async_trait]
impl RequestStore for SqlRequestStore {
    async fn create_quote(&self, quote: QuoteRequest) -> Result<QuoteRequest, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO quote_request
                (id, first_name, last_name, email, phone, project_description,
                 desired_delivery_date, offer_id, status, appointment_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id.0)
        .bind(&quote.contact.first_name)
        .bind(&quote.contact.last_name)
        .bind(&quote.contact.email)
        .bind(&quote.contact.phone)
        .bind(&quote.project_description)
        .bind(quote.desired_delivery_date.map(|date| date.format("%Y-%m-%d").to_string()))
        .bind(quote.offer_id.as_ref().map(|id| id.0.as_str()))
        .bind(quote.status.as_str())
        .bind(quote.appointment_id.as_ref().map(|id| id.0.as_str()))
        .bind(quote.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for (position, selection) in quote.selections.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quote_request_option (quote_id, option_id, quantity, position)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&quote.id.0)
            .bind(&selection.option_id.0)
            .bind(i64::from(selection.quantity))
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(quote)
    }

    async fn find_quote(&self, id: &QuoteId) -> Result<Option<QuoteRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quote_request WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(self.quote_with_selections(&row).await?)),
        }
    }

    async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<QuoteRequest>, StoreError> {
        let rows = match status {
            None => sqlx::query(&format!(
                "SELECT {QUOTE_COLUMNS} FROM quote_request ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?,
            Some(status) => sqlx::query(&format!(
                "SELECT {QUOTE_COLUMNS} FROM quote_request
                 WHERE status = ? ORDER BY created_at DESC"
            ))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?,
        };

        let mut quotes = Vec::with_capacity(rows.len());
        for row in &rows {
            quotes.push(self.quote_with_selections(row).await?);
        }
        Ok(quotes)
    }

    async fn replace_quote_options(
        &self,
        id: &QuoteId,
        selections: Vec<Selection>,
    ) -> Result<Option<QuoteRequest>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM quote_request WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if exists.is_none() {
            return Ok(None);
        }

        // Delete-then-insert inside one transaction: no reader ever sees a
        // partially swapped option set.
        sqlx::query("DELETE FROM quote_request_option WHERE quote_id = ?")
            .bind(&id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for (position, selection) in selections.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quote_request_option (quote_id, option_id, quantity, position)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&id.0)
            .bind(&selection.option_id.0)
            .bind(i64::from(selection.quantity))
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        self.find_quote(id).await
    }

    async fn set_quote_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
    ) -> Result<Option<QuoteRequest>, StoreError> {
        let result = sqlx::query("UPDATE quote_request SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_quote(id).await
    }

    async fn delete_quote(&self, id: &QuoteId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM quote_request WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_appointment(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, StoreError> {
        sqlx::query(
            "INSERT INTO appointment
                (id, scheduled_at, reason, details, status, pending_token, user_email, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&appointment.id.0)
        .bind(appointment.scheduled_at.to_rfc3339())
        .bind(&appointment.reason)
        .bind(&appointment.details)
        .bind(appointment.status.as_str())
        .bind(appointment.pending_token.as_ref().map(|token| token.0.as_str()))
        .bind(&appointment.user_email)
        .bind(appointment.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(appointment)
    }

    async fn find_appointment_by_token(
        &self,
        token: &PendingToken,
    ) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointment WHERE pending_token = ?"
        ))
        .bind(&token.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(decode_appointment).transpose()
    }

    async fn confirm_appointment_by_token(
        &self,
        token: &PendingToken,
        user_email: &str,
    ) -> Result<Option<Appointment>, StoreError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM appointment WHERE pending_token = ?")
                .bind(&token.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        let Some(id) = id else { return Ok(None) };

        // Update by id with the token still set: of two concurrent
        // completions, exactly one matches and the loser observes a spent
        // token.
        let result = sqlx::query(
            "UPDATE appointment
             SET status = 'CONFIRMED', user_email = ?, pending_token = NULL
             WHERE id = ? AND pending_token = ?",
        )
        .bind(user_email)
        .bind(&id)
        .bind(&token.0)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointment WHERE id = ?"
        ))
        .bind(&id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(decode_appointment).transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use atelier_core::domain::appointment::{Appointment, AppointmentStatus};
    use atelier_core::domain::catalog::OptionId;
    use atelier_core::domain::quote::{
        Contact, QuoteId, QuoteRequest, QuoteStatus, Selection,
    };
    use atelier_core::stores::RequestStore;

    use crate::{connect_with_settings, migrations};

    use super::SqlRequestStore;

    async fn store() -> SqlRequestStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlRequestStore::new(pool)
    }

    fn quote() -> QuoteRequest {
        QuoteRequest {
            id: QuoteId::generate(),
            contact: Contact {
                first_name: Some("Nadia".to_string()),
                last_name: Some("Verne".to_string()),
                email: "nadia@example.org".to_string(),
                phone: Some("0612345678".to_string()),
            },
            project_description: "Refonte du site vitrine avec blog.".to_string(),
            desired_delivery_date: Some(
                chrono::NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date"),
            ),
            offer_id: None,
            selections: vec![
                Selection { option_id: OptionId("seo".to_string()), quantity: 1 },
                Selection { option_id: OptionId("maintenance".to_string()), quantity: 2 },
            ],
            status: QuoteStatus::New,
            appointment_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn quote_round_trip_preserves_selection_order() {
        let store = store().await;
        let quote = store.create_quote(quote()).await.expect("create");

        let found = store
            .find_quote(&quote.id)
            .await
            .expect("query")
            .expect("quote exists");

        assert_eq!(found.selections, quote.selections);
        assert_eq!(found.contact.email, "nadia@example.org");
        assert_eq!(found.desired_delivery_date, quote.desired_delivery_date);
        assert_eq!(found.status, QuoteStatus::New);
    }

    #[tokio::test]
    async fn replacing_options_discards_the_old_set_atomically() {
        let store = store().await;
        let quote = store.create_quote(quote()).await.expect("create");

        let replaced = store
            .replace_quote_options(
                &quote.id,
                vec![Selection { option_id: OptionId("redaction".to_string()), quantity: 5 }],
            )
            .await
            .expect("replace")
            .expect("quote exists");

        assert_eq!(replaced.selections.len(), 1);
        assert_eq!(replaced.selections[0].option_id.0, "redaction");
        assert_eq!(replaced.selections[0].quantity, 5);

        let missing = store
            .replace_quote_options(
                &QuoteId("QR-missing".to_string()),
                vec![Selection { option_id: OptionId("seo".to_string()), quantity: 1 }],
            )
            .await
            .expect("query");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn status_updates_and_deletes_report_missing_rows() {
        let store = store().await;
        let quote = store.create_quote(quote()).await.expect("create");

        let updated = store
            .set_quote_status(&quote.id, QuoteStatus::Sent)
            .await
            .expect("update")
            .expect("quote exists");
        assert_eq!(updated.status, QuoteStatus::Sent);

        assert!(store.delete_quote(&quote.id).await.expect("delete"));
        assert!(!store.delete_quote(&quote.id).await.expect("second delete"));
        assert!(store
            .set_quote_status(&quote.id, QuoteStatus::Reviewed)
            .await
            .expect("update on missing")
            .is_none());
    }

    #[tokio::test]
    async fn token_confirmation_is_single_use() {
        let store = store().await;
        let now = Utc::now();
        let appointment = store
            .create_appointment(Appointment::pending(
                now + Duration::days(5),
                "Cadrage du projet".to_string(),
                None,
                now,
            ))
            .await
            .expect("create");
        let token = appointment.pending_token.clone().expect("token issued");

        let confirmed = store
            .confirm_appointment_by_token(&token, "nadia@example.org")
            .await
            .expect("first call")
            .expect("first confirmation wins");
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmed.user_email.as_deref(), Some("nadia@example.org"));
        assert!(confirmed.pending_token.is_none());

        let second = store
            .confirm_appointment_by_token(&token, "other@example.org")
            .await
            .expect("second call");
        assert!(second.is_none());

        assert!(store
            .find_appointment_by_token(&token)
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn list_quotes_filters_by_status() {
        let store = store().await;
        let first = store.create_quote(quote()).await.expect("first");
        store.create_quote(quote()).await.expect("second");
        store
            .set_quote_status(&first.id, QuoteStatus::Sent)
            .await
            .expect("update")
            .expect("quote exists");

        let sent = store.list_quotes(Some(QuoteStatus::Sent)).await.expect("sent");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, first.id);

        let all = store.list_quotes(None).await.expect("all");
        assert_eq!(all.len(), 2);
    }
}

use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use crate::db::PgStore;
use crate::error::{StoreError, StoreResult};
use crate::invoices::repo_types::{Invoice, InvoiceRow, InvoiceUpdate, NewInvoice};

#[async_trait]
pub trait InvoiceRepo: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Invoice>>;
    async fn find(&self, id: Uuid) -> StoreResult<Option<Invoice>>;
    async fn insert(&self, invoice: NewInvoice) -> StoreResult<Invoice>;
    /// Applies the status (if any), sets `payment_date` only when it is still
    /// empty, and always bumps `updated_at`.
    async fn update(&self, id: Uuid, changes: InvoiceUpdate) -> StoreResult<Option<Invoice>>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

fn decode(row: InvoiceRow) -> StoreResult<Invoice> {
    Invoice::try_from(row).map_err(StoreError::Backend)
}

#[async_trait]
impl InvoiceRepo for PgStore {
    async fn list(&self) -> StoreResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, user_id, items, total_amount, status, created_at, updated_at, payment_date
            FROM invoices
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(decode).collect()
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, user_id, items, total_amount, status, created_at, updated_at, payment_date
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(decode).transpose()
    }

    async fn insert(&self, invoice: NewInvoice) -> StoreResult<Invoice> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            INSERT INTO invoices (user_id, items, total_amount, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, items, total_amount, status, created_at, updated_at, payment_date
            "#,
        )
        .bind(invoice.user_id)
        .bind(Json(&invoice.items))
        .bind(invoice.total_amount)
        .bind(invoice.status.as_str())
        .fetch_one(self.pool())
        .await?;
        decode(row)
    }

    async fn update(&self, id: Uuid, changes: InvoiceUpdate) -> StoreResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            UPDATE invoices
               SET status       = COALESCE($2, status),
                   payment_date = COALESCE(payment_date, $3),
                   updated_at   = now()
             WHERE id = $1
            RETURNING id, user_id, items, total_amount, status, created_at, updated_at, payment_date
            "#,
        )
        .bind(id)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.payment_date)
        .fetch_optional(self.pool())
        .await?;
        row.map(decode).transpose()
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

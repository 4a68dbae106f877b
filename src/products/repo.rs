use async_trait::async_trait;
use uuid::Uuid;

use crate::db::PgStore;
use crate::error::StoreResult;
use crate::products::repo_types::{NewProduct, Product, ProductUpdate};

#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Product>>;
    async fn find(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn insert(&self, product: NewProduct) -> StoreResult<Product>;
    /// Overwrites the mutable fields and bumps `updated_at`. `None` if the id is gone.
    async fn update(&self, id: Uuid, changes: ProductUpdate) -> StoreResult<Option<Product>>;
    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
impl ProductRepo for PgStore {
    async fn list(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, stock, created_at, updated_at
            FROM products
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, stock, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, price, stock, created_at, updated_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: ProductUpdate) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
               SET name = $2, description = $3, price = $4, stock = $5, updated_at = now()
             WHERE id = $1
            RETURNING id, name, description, price, stock, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.price)
        .bind(changes.stock)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

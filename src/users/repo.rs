use async_trait::async_trait;
use uuid::Uuid;

use crate::db::PgStore;
use crate::error::{StoreError, StoreResult};
use crate::users::repo_types::{NewUser, User, UserRow, UserUpdate};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<User>>;
    async fn find(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Expects an already normalized email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Fails with `StoreError::Duplicate("email")` when the email is taken.
    async fn insert(&self, user: NewUser) -> StoreResult<User>;
    async fn update(&self, id: Uuid, changes: UserUpdate) -> StoreResult<Option<User>>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

fn decode(row: UserRow) -> StoreResult<User> {
    User::try_from(row).map_err(StoreError::Backend)
}

#[async_trait]
impl UserRepo for PgStore {
    async fn list(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(decode).collect()
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(decode).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        row.map(decode).transpose()
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(self.pool())
        .await?;
        decode(row)
    }

    async fn update(&self, id: Uuid, changes: UserUpdate) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET name          = COALESCE($2, name),
                   email         = COALESCE($3, email),
                   password_hash = COALESCE($4, password_hash),
                   role          = COALESCE($5, role),
                   updated_at    = now()
             WHERE id = $1
            RETURNING id, name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.role.map(|r| r.as_str()))
        .fetch_optional(self.pool())
        .await?;
        row.map(decode).transpose()
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

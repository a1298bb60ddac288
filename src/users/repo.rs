use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::users::repo_types::{Lookup, User};
use crate::users::schema::USERS;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A write would break a storage-level constraint (duplicate email).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("no user row with id {0}")]
    NotFound(i64),
    #[error("user has no id")]
    MissingId,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let what = db.constraint().unwrap_or_else(|| db.message()).to_string();
                return StoreError::ConstraintViolation(what);
            }
        }
        StoreError::Database(e)
    }
}

/// Persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Every stored user, ordered by id.
    async fn find_all(&self) -> Result<Vec<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Lookup, StoreError>;
    /// Exact match under the store's default collation.
    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;
    /// Inserts when `user.id` is unset, otherwise overwrites the row with that id.
    async fn save(&self, user: User) -> Result<User, StoreError>;
    async fn delete(&self, user: &User) -> Result<(), StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Creates the `users` table if missing, for databases the migrator could not reach.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(&USERS.create_sql()).execute(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, address
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> Result<Lookup, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, address
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)"#,
        )
        .bind(email)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn save(&self, user: User) -> Result<User, StoreError> {
        match user.id {
            None => {
                let row = sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (name, email, address)
                    VALUES ($1, $2, $3)
                    RETURNING id, name, email, address
                    "#,
                )
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.address)
                .fetch_one(&self.db)
                .await?;
                Ok(row)
            }
            Some(id) => {
                let row = sqlx::query_as::<_, User>(
                    r#"
                    UPDATE users
                    SET name = $2, email = $3, address = $4
                    WHERE id = $1
                    RETURNING id, name, email, address
                    "#,
                )
                .bind(id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.address)
                .fetch_optional(&self.db)
                .await?;
                row.ok_or(StoreError::NotFound(id))
            }
        }
    }

    async fn delete(&self, user: &User) -> Result<(), StoreError> {
        let id = user.id.ok_or(StoreError::MissingId)?;
        let done = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

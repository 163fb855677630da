use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AdminError, Result};
use crate::users::repo_types::{NewUser, RoleSet, User, UserRow, UserSummary};

/// Persistence port for the `users` table.
///
/// Email lookups are case-insensitive, preferring an exact match.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fails with [`AdminError::DuplicateEmail`] when the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User>;

    async fn update_roles(&self, email: &str, roles: &RoleSet) -> Result<Option<User>>;

    /// Returns `false` when no row has this id.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool>;

    async fn list_all(&self) -> Result<Vec<UserSummary>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, roles
            FROM users
            WHERE lower(email) = lower($1)
            ORDER BY (email = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, password_hash, roles)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, roles
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.roles.to_db())
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AdminError::DuplicateEmail(user.email.clone())
            }
            other => AdminError::Database(other),
        })?;
        Ok(row.into())
    }

    async fn update_roles(&self, email: &str, roles: &RoleSet) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET roles = $2
            WHERE id = (
                SELECT id FROM users
                WHERE lower(email) = lower($1)
                ORDER BY (email = $1) DESC
                LIMIT 1
            )
            RETURNING id, name, email, password_hash, roles
            "#,
        )
        .bind(email)
        .bind(roles.to_db())
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email
            FROM users
            ORDER BY name, email
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

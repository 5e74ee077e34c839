use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, Result},
    models::user::{Role, User},
};

/// User store for database operations
#[derive(Clone)]
pub struct UserStore {
    pool: DbPool,
}

impl UserStore {
    /// Create a new UserStore with the provided database pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("User".into()))?;

        Ok(user)
    }

    /// Find a user by email, case-insensitively
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn count_users(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(count.0)
    }

    /// Create a new user with an already hashed password
    pub async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User> {
        if self.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("An account with this email already exists".into()));
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        self.get_user_by_id(id).await
    }
}

/// Two sign-ups racing on one email both pass the lookup; the UNIQUE index rejects the second
fn insert_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            tracing::debug!("Duplicate account rejected by unique index");
            AppError::Conflict("An account with this email already exists".into())
        }
        other => AppError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_pool;

    #[tokio::test]
    async fn unique_violation_on_insert_is_a_conflict() {
        let pool = init_test_pool().await;
        let insert = || {
            sqlx::query(
                "INSERT INTO users (id, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind("race@tn.gov")
            .bind("hash")
            .bind(Role::User)
            .bind(Utc::now())
            .execute(&pool)
        };

        insert().await.unwrap();
        let err = insert().await.map_err(insert_error).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, Result},
    models::user::Session,
};

/// Session store for database operations
#[derive(Clone)]
pub struct SessionStore {
    pool: DbPool,
}

impl SessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open a new session for a user
    pub async fn create(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            expires_at,
            revoked_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, created_at, expires_at, revoked_at)
            VALUES (?, ?, ?, ?, NULL)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(session)
    }

    /// A session that exists, is not revoked, and has not expired
    pub async fn get_active(&self, id: Uuid) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let now = Utc::now();
        Ok(session.filter(|s| s.revoked_at.is_none() && s.expires_at > now))
    }

    /// Revoke a session; revoking twice is harmless
    pub async fn revoke(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }
}

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

use super::{password::hash_password, IdentityError, IdentityProvider};

/// Credentials kept in the application's own Postgres database
/// (`auth_identities`), hashed with argon2.
#[derive(Clone)]
pub struct LocalIdentityProvider {
    db: PgPool,
}

impl LocalIdentityProvider {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_identity(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        let plain = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hash_password(&plain))
            .await
            .context("join password hasher")??;

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO auth_identities (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(&hash)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(id) => {
                debug!(user_id = %id, "local identity created");
                Ok(id)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(IdentityError::AlreadyRegistered)
            }
            Err(e) => {
                error!(error = %e, "insert auth_identities failed");
                Err(IdentityError::Rejected(e.to_string()))
            }
        }
    }

    async fn delete_identity(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM auth_identities WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete auth_identities")?;
        Ok(())
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::{NewProfile, ProfileRow, TermsAgreementRow};

/// Store failures, classified by what the services need to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("foreign key constraint violated")]
    ForeignKeyViolation,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected write: {0}")]
    Rejected(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::ForeignKeyViolation
            }
            sqlx::Error::Database(_) => StoreError::Rejected(e.to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Rejected(e.to_string()),
        }
    }
}

/// Rows this service owns: one profile per identity, at most one
/// terms agreement per profile.
#[async_trait]
pub trait SignupStore: Send + Sync {
    async fn insert_profile(&self, profile: &NewProfile) -> Result<ProfileRow, StoreError>;

    /// Inserts the agreement unless one already exists for `user_id`.
    /// Returns `Ok(None)` when it does.
    async fn insert_agreement(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TermsAgreementRow>, StoreError>;
}

#[derive(Clone)]
pub struct PgSignupStore {
    db: PgPool,
}

impl PgSignupStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SignupStore for PgSignupStore {
    async fn insert_profile(&self, profile: &NewProfile) -> Result<ProfileRow, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO users (id, email, role, name, phone_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, role, name, phone_number, created_at, updated_at
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(&profile.name)
        .bind(&profile.phone_number)
        .fetch_one(&self.db)
        .await?;
        debug!(user_id = %row.id, "profile row inserted");
        Ok(row)
    }

    async fn insert_agreement(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TermsAgreementRow>, StoreError> {
        let row = sqlx::query_as::<_, TermsAgreementRow>(
            r#"
            INSERT INTO terms_agreements (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, agreed_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}

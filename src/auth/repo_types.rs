use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::{Role, TermsAgreement, UserProfile};

/// Profile fields written at signup.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: String,
    pub phone_number: String,
}

/// Row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Row of the `terms_agreements` table.
#[derive(Debug, Clone, FromRow)]
pub struct TermsAgreementRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agreed_at: OffsetDateTime,
}

impl ProfileRow {
    /// `None` when the stored role is outside the known set.
    pub fn into_profile(self) -> Option<UserProfile> {
        Some(UserProfile {
            id: self.id,
            email: self.email,
            role: Role::parse(&self.role)?,
            name: self.name,
            phone_number: self.phone_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<TermsAgreementRow> for TermsAgreement {
    fn from(r: TermsAgreementRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            agreed_at: r.agreed_at,
        }
    }
}

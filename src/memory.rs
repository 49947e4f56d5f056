//! In-process backends for local development and tests. Nothing survives a
//! restart.

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{SignupStore, StoreError};
use crate::auth::repo_types::{NewProfile, ProfileRow, TermsAgreementRow};
use crate::identity::{IdentityError, IdentityProvider};

/// Issues identities keyed by case-folded email. Credentials are not
/// retained: there is no login surface behind this provider.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    by_email: DashMap<String, Uuid>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.by_email.contains_key(&email.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_identity(&self, email: &str, _password: &str) -> Result<Uuid, IdentityError> {
        match self.by_email.entry(email.to_lowercase()) {
            Entry::Occupied(_) => Err(IdentityError::AlreadyRegistered),
            Entry::Vacant(slot) => {
                let id = Uuid::new_v4();
                slot.insert(id);
                Ok(id)
            }
        }
    }

    async fn delete_identity(&self, id: Uuid) -> anyhow::Result<()> {
        self.by_email.retain(|_, v| *v != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySignupStore {
    profiles: DashMap<Uuid, ProfileRow>,
    agreements: DashMap<Uuid, TermsAgreementRow>,
}

impl MemorySignupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, id: Uuid) -> Option<ProfileRow> {
        self.profiles.get(&id).map(|r| r.value().clone())
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn agreement_count(&self) -> usize {
        self.agreements.len()
    }
}

#[async_trait]
impl SignupStore for MemorySignupStore {
    async fn insert_profile(&self, profile: &NewProfile) -> Result<ProfileRow, StoreError> {
        match self.profiles.entry(profile.id) {
            Entry::Occupied(_) => Err(StoreError::UniqueViolation),
            Entry::Vacant(slot) => {
                let now = OffsetDateTime::now_utc();
                let row = ProfileRow {
                    id: profile.id,
                    email: profile.email.clone(),
                    role: profile.role.as_str().to_string(),
                    name: profile.name.clone(),
                    phone_number: Some(profile.phone_number.clone()),
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn insert_agreement(
        &self,
        user_id: Uuid,
    ) -> Result<Option<TermsAgreementRow>, StoreError> {
        if !self.profiles.contains_key(&user_id) {
            return Err(StoreError::ForeignKeyViolation);
        }
        match self.agreements.entry(user_id) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let row = TermsAgreementRow {
                    id: Uuid::new_v4(),
                    user_id,
                    agreed_at: OffsetDateTime::now_utc(),
                };
                slot.insert(row.clone());
                Ok(Some(row))
            }
        }
    }
}

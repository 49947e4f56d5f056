use tracing::{error, info, instrument, warn};

use crate::auth::{
    dto::{
        SignupRequest, SignupResponse, TermsAgreementRequest, TermsAgreementResponse,
    },
    error::AuthError,
    repo::StoreError,
    repo_types::NewProfile,
};
use crate::identity::IdentityError;
use crate::state::AppState;
use uuid::Uuid;

pub const SIGNUP_COMPLETED: &str = "회원가입이 완료되었습니다";
pub const TERMS_AGREED: &str = "약관 동의가 완료되었습니다";

/// Create the identity, then the profile row keyed by it.
///
/// When the profile cannot be stored the identity is deleted again so the
/// email can be reused; a failed cleanup is logged and otherwise ignored.
#[instrument(skip(state, req), fields(role = req.role.as_str()))]
pub async fn register_user(
    state: &AppState,
    req: SignupRequest,
) -> Result<SignupResponse, AuthError> {
    let user_id = match state
        .identity
        .create_identity(&req.email, &req.password)
        .await
    {
        Ok(id) => id,
        Err(IdentityError::AlreadyRegistered) => {
            warn!(email = %req.email, "email already registered");
            return Err(AuthError::EmailAlreadyExists);
        }
        Err(e) => {
            error!(error = %e, email = %req.email, "identity creation failed");
            return Err(AuthError::UserCreationFailed);
        }
    };

    let new_profile = NewProfile {
        id: user_id,
        email: req.email,
        role: req.role,
        name: req.name,
        phone_number: req.phone_number,
    };

    let row = match state.store.insert_profile(&new_profile).await {
        Ok(row) => row,
        Err(e) => {
            error!(error = %e, %user_id, "profile insert failed");
            discard_identity(state, user_id).await;
            return Err(AuthError::ProfileCreationFailed);
        }
    };

    let Some(user) = row.into_profile() else {
        error!(%user_id, "stored profile has an unknown role");
        discard_identity(state, user_id).await;
        return Err(AuthError::Database);
    };

    info!(%user_id, email = %user.email, "user registered");
    Ok(SignupResponse {
        user,
        message: SIGNUP_COMPLETED.to_string(),
    })
}

async fn discard_identity(state: &AppState, user_id: Uuid) {
    if let Err(e) = state.identity.delete_identity(user_id).await {
        error!(error = %e, %user_id, "orphaned identity left behind");
    }
}

/// Record that `user_id` accepted the terms. At most one record per user;
/// the store enforces it atomically.
#[instrument(skip(state, req), fields(user_id = %req.user_id))]
pub async fn agree_to_terms(
    state: &AppState,
    req: TermsAgreementRequest,
) -> Result<TermsAgreementResponse, AuthError> {
    match state.store.insert_agreement(req.user_id).await {
        Ok(Some(row)) => {
            info!(agreement_id = %row.id, "terms agreed");
            Ok(TermsAgreementResponse {
                agreement: row.into(),
                message: TERMS_AGREED.to_string(),
            })
        }
        Ok(None) | Err(StoreError::UniqueViolation) => {
            warn!("terms already agreed");
            Err(AuthError::TermsAlreadyAgreed)
        }
        Err(e) => {
            error!(error = %e, "terms agreement insert failed");
            Err(AuthError::TermsAgreementFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::Role;
    use crate::auth::repo::SignupStore;
    use crate::auth::repo_types::{ProfileRow, TermsAgreementRow};
    use crate::config::AppConfig;
    use crate::identity::IdentityProvider;
    use crate::memory::{MemoryIdentityProvider, MemorySignupStore};
    use async_trait::async_trait;
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            password: "Abcd1234!".into(),
            role: Role::Learner,
            name: "Kim".into(),
            phone_number: "010-1234-5678".into(),
            agree_to_terms: true,
        }
    }

    struct BrokenStore(fn() -> StoreError);

    #[async_trait]
    impl SignupStore for BrokenStore {
        async fn insert_profile(&self, _p: &NewProfile) -> Result<ProfileRow, StoreError> {
            Err((self.0)())
        }
        async fn insert_agreement(
            &self,
            _user_id: Uuid,
        ) -> Result<Option<TermsAgreementRow>, StoreError> {
            Err((self.0)())
        }
    }

    struct NoIdProvider;

    #[async_trait]
    impl IdentityProvider for NoIdProvider {
        async fn create_identity(&self, _e: &str, _p: &str) -> Result<Uuid, IdentityError> {
            Err(IdentityError::MissingIdentifier)
        }
        async fn delete_identity(&self, _id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn state_with(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn SignupStore>,
    ) -> AppState {
        AppState::from_parts(Arc::new(AppConfig::in_memory()), identity, store)
    }

    #[tokio::test]
    async fn registers_and_returns_profile() {
        let store = Arc::new(MemorySignupStore::new());
        let state = state_with(Arc::new(MemoryIdentityProvider::new()), store.clone());

        let res = register_user(&state, signup("a@b.com")).await.expect("registered");
        assert_eq!(res.message, SIGNUP_COMPLETED);
        assert_eq!(res.user.role, Role::Learner);
        assert_eq!(res.user.phone_number.as_deref(), Some("010-1234-5678"));
        assert!(store.profile(res.user.id).is_some());
    }

    #[tokio::test]
    async fn duplicate_email_creates_no_profile() {
        let store = Arc::new(MemorySignupStore::new());
        let state = state_with(Arc::new(MemoryIdentityProvider::new()), store.clone());

        register_user(&state, signup("a@b.com")).await.unwrap();
        let err = register_user(&state, signup("a@b.com")).await.unwrap_err();
        assert_eq!(err, AuthError::EmailAlreadyExists);
        assert_eq!(store.profile_count(), 1);
    }

    #[tokio::test]
    async fn missing_identifier_is_user_creation_failure() {
        let state = state_with(Arc::new(NoIdProvider), Arc::new(MemorySignupStore::new()));
        let err = register_user(&state, signup("a@b.com")).await.unwrap_err();
        assert_eq!(err, AuthError::UserCreationFailed);
    }

    #[tokio::test]
    async fn failed_profile_insert_removes_identity() {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let state = state_with(
            identity.clone(),
            Arc::new(BrokenStore(|| StoreError::Rejected("check violation".into()))),
        );

        let err = register_user(&state, signup("a@b.com")).await.unwrap_err();
        assert_eq!(err, AuthError::ProfileCreationFailed);
        assert!(!identity.contains_email("a@b.com"));
    }

    #[tokio::test]
    async fn unavailable_store_fails_with_the_insert_code() {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let state = state_with(
            identity.clone(),
            Arc::new(BrokenStore(|| StoreError::Unavailable("pool timed out".into()))),
        );
        let err = register_user(&state, signup("a@b.com")).await.unwrap_err();
        assert_eq!(err, AuthError::ProfileCreationFailed);
        assert!(identity.is_empty());

        let err = agree_to_terms(&state, TermsAgreementRequest { user_id: Uuid::new_v4() })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::TermsAgreementFailed);
    }

    /// Hands back a row whose role column holds something unknown.
    struct OddRoleStore;

    #[async_trait]
    impl SignupStore for OddRoleStore {
        async fn insert_profile(&self, p: &NewProfile) -> Result<ProfileRow, StoreError> {
            let now = OffsetDateTime::now_utc();
            Ok(ProfileRow {
                id: p.id,
                email: p.email.clone(),
                role: "admin".into(),
                name: p.name.clone(),
                phone_number: Some(p.phone_number.clone()),
                created_at: now,
                updated_at: now,
            })
        }
        async fn insert_agreement(
            &self,
            _user_id: Uuid,
        ) -> Result<Option<TermsAgreementRow>, StoreError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn unknown_stored_role_removes_identity() {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let state = state_with(identity.clone(), Arc::new(OddRoleStore));

        let err = register_user(&state, signup("a@b.com")).await.unwrap_err();
        assert_eq!(err, AuthError::Database);
        assert!(!identity.contains_email("a@b.com"));
    }

    #[tokio::test]
    async fn agreement_is_recorded_once() {
        let state = AppState::in_memory();
        let user = register_user(&state, signup("a@b.com")).await.unwrap().user;

        let first = agree_to_terms(&state, TermsAgreementRequest { user_id: user.id })
            .await
            .expect("first agreement");
        assert_eq!(first.agreement.user_id, user.id);
        assert_eq!(first.message, TERMS_AGREED);

        let err = agree_to_terms(&state, TermsAgreementRequest { user_id: user.id })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::TermsAlreadyAgreed);
    }

    #[tokio::test]
    async fn agreement_for_unknown_user_fails() {
        let state = AppState::in_memory();
        let err = agree_to_terms(&state, TermsAgreementRequest { user_id: Uuid::new_v4() })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::TermsAgreementFailed);
    }

    #[tokio::test]
    async fn rejected_agreement_insert() {
        let state = state_with(
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(BrokenStore(|| StoreError::Rejected("disk full".into()))),
        );
        let err = agree_to_terms(&state, TermsAgreementRequest { user_id: Uuid::new_v4() })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::TermsAgreementFailed);
    }

    #[tokio::test]
    async fn concurrent_agreements_yield_one_row() {
        let store = Arc::new(MemorySignupStore::new());
        let state = state_with(Arc::new(MemoryIdentityProvider::new()), store.clone());
        let user_id = register_user(&state, signup("a@b.com")).await.unwrap().user.id;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    agree_to_terms(&state, TermsAgreementRequest { user_id }).await
                })
            })
            .collect();

        let mut ok = 0;
        for t in tasks {
            match t.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert_eq!(e, AuthError::TermsAlreadyAgreed),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.agreement_count(), 1);
    }
}

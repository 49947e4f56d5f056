use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use lms_signup::auth::repo::{SignupStore, StoreError};
use lms_signup::auth::repo_types::{NewProfile, ProfileRow, TermsAgreementRow};
use lms_signup::config::AppConfig;
use lms_signup::memory::{MemoryIdentityProvider, MemorySignupStore};
use lms_signup::{build_app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    #[allow(dead_code)]
    pub identity: Arc<MemoryIdentityProvider>,
    #[allow(dead_code)]
    pub store: Arc<MemorySignupStore>,
}

/// Store whose database is unreachable.
#[allow(dead_code)]
pub struct DownStore;

#[async_trait]
impl SignupStore for DownStore {
    async fn insert_profile(&self, _p: &NewProfile) -> Result<ProfileRow, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn insert_agreement(
        &self,
        _user_id: Uuid,
    ) -> Result<Option<TermsAgreementRow>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Router over in-memory identities and the given store. The `store` handle
/// is a fresh memory store that the router does not use.
#[allow(dead_code)]
pub fn create_test_app_with_store(store: Arc<dyn SignupStore>) -> TestApp {
    let identity = Arc::new(MemoryIdentityProvider::new());
    let state = AppState::from_parts(Arc::new(AppConfig::in_memory()), identity.clone(), store);
    TestApp {
        router: build_app(state),
        identity,
        store: Arc::new(MemorySignupStore::new()),
    }
}

/// Router over in-memory backends, with handles to inspect them.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let identity = Arc::new(MemoryIdentityProvider::new());
    let store = Arc::new(MemorySignupStore::new());
    let state = AppState::from_parts(
        Arc::new(AppConfig::in_memory()),
        identity.clone(),
        store.clone(),
    );
    TestApp {
        router: build_app(state),
        identity,
        store,
    }
}

#[allow(dead_code)]
pub fn valid_signup() -> Value {
    json!({
        "email": "a@b.com",
        "password": "Abcd1234!",
        "role": "learner",
        "name": "Kim",
        "phoneNumber": "010-1234-5678",
        "agreeToTerms": true
    })
}

#[allow(dead_code)]
pub async fn post_raw(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[allow(dead_code)]
pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{IdentityError, IdentityProvider};
use crate::config::SupabaseConfig;

/// Supabase Auth (GoTrue) over its REST API.
#[derive(Clone)]
pub struct SupabaseIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

#[derive(Serialize)]
struct SignupBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl SupabaseIdentityProvider {
    pub fn new(cfg: &SupabaseConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: cfg.url.trim_end_matches('/').to_string(),
            anon_key: cfg.anon_key.clone(),
            service_role_key: cfg.service_role_key.clone(),
        }
    }
}

/// GoTrue answers either a bare user or `{ user, session... }`.
pub(crate) fn user_id_from_signup(body: &Value) -> Option<Uuid> {
    body.get("user")
        .and_then(|u| u.get("id"))
        .or_else(|| body.get("id"))
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

pub(crate) fn is_already_registered(body: &Value) -> bool {
    if body.get("error_code").and_then(Value::as_str) == Some("user_already_exists") {
        return true;
    }
    ["msg", "message", "error_description", "error"]
        .iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_str))
        .any(|m| m.to_lowercase().contains("already registered"))
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn create_identity(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        let res = self
            .http
            .post(format!("{}/auth/v1/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&SignupBody { email, password })
            .send()
            .await
            .context("supabase signup request")?;

        let status = res.status();
        let body: Value = res.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            if is_already_registered(&body) {
                return Err(IdentityError::AlreadyRegistered);
            }
            warn!(%status, body = %body, "supabase signup rejected");
            return Err(IdentityError::Rejected(format!("status {status}")));
        }

        let id = user_id_from_signup(&body).ok_or(IdentityError::MissingIdentifier)?;
        debug!(user_id = %id, "supabase identity created");
        Ok(id)
    }

    async fn delete_identity(&self, id: Uuid) -> anyhow::Result<()> {
        let Some(key) = &self.service_role_key else {
            anyhow::bail!("SUPABASE_SERVICE_ROLE_KEY not configured");
        };
        let res = self
            .http
            .delete(format!("{}/auth/v1/admin/users/{}", self.base_url, id))
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await
            .context("supabase admin delete user")?;
        if !res.status().is_success() {
            anyhow::bail!("supabase admin delete user: status {}", res.status());
        }
        Ok(())
    }
}

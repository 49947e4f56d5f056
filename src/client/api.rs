use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use crate::auth::dto::{Envelope, SignupRequest, SignupResponse};

#[derive(Debug, Clone)]
pub enum SignupReply {
    Accepted(SignupResponse),
    /// Non-2xx answer; `message` is the server's `error.message` if any.
    Rejected { message: Option<String> },
}

#[async_trait]
pub trait SignupApi: Send + Sync {
    /// `Err` only for transport or decoding failures.
    async fn signup(&self, req: &SignupRequest) -> anyhow::Result<SignupReply>;
}

#[derive(Clone)]
pub struct HttpSignupApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSignupApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

pub(crate) fn error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl SignupApi for HttpSignupApi {
    async fn signup(&self, req: &SignupRequest) -> anyhow::Result<SignupReply> {
        let res = self
            .http
            .post(format!("{}/auth/signup", self.base_url))
            .json(req)
            .send()
            .await
            .context("post /auth/signup")?;

        if res.status().is_success() {
            let env: Envelope<SignupResponse> =
                res.json().await.context("decode signup envelope")?;
            return Ok(SignupReply::Accepted(env.data));
        }

        let body: Value = res.json().await.unwrap_or(Value::Null);
        Ok(SignupReply::Rejected {
            message: error_message(&body),
        })
    }
}

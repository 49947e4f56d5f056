use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{Envelope, SignupResponse, TermsAgreementResponse},
        error::ApiError,
        schema,
        services::{agree_to_terms, register_user},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/terms-agreement", post(terms_agreement))
}

/// Bodies are read as JSON whatever the declared content type. A body that
/// is not JSON at all never reaches the schema and is answered as an
/// unclassified failure.
fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        error!(error = %e, "unreadable json body");
        ApiError::Unclassified
    })
}

#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Envelope<SignupResponse>>), ApiError> {
    let value = json_body(&body)?;
    let req = schema::parse_signup(&value).map_err(|details| {
        warn!(violations = details.len(), "signup validation failed");
        ApiError::Validation(details)
    })?;

    let data = register_user(&state, req).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(data))))
}

#[instrument(skip(state, body))]
pub async fn terms_agreement(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Envelope<TermsAgreementResponse>>), ApiError> {
    let value = json_body(&body)?;
    let req = schema::parse_terms_agreement(&value).map_err(|details| {
        warn!(violations = details.len(), "terms agreement validation failed");
        ApiError::Validation(details)
    })?;

    let data = agree_to_terms(&state, req).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(data))))
}

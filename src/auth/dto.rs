use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role chosen at signup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Learner,
    Instructor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Instructor => "instructor",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "learner" => Some(Role::Learner),
            "instructor" => Some(Role::Instructor),
            _ => None,
        }
    }

    /// Landing page after login.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Learner => "/courses",
            Role::Instructor => "/instructor/dashboard",
        }
    }

    /// Human name of the landing page, used in the signup confirmation.
    pub fn home_label(&self) -> &'static str {
        match self {
            Role::Learner => "코스 카탈로그",
            Role::Instructor => "강사 대시보드",
        }
    }
}

/// Request body for `POST /auth/signup`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    pub phone_number: String,
    pub agree_to_terms: bool,
}

/// Request body for `POST /auth/terms-agreement`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TermsAgreementRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TermsAgreement {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub agreed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user: UserProfile,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsAgreementResponse {
    pub agreement: TermsAgreement,
    pub message: String,
}

/// Success side of the `{ success, data | error }` envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

//! Signup form state as explicit transitions: `state.apply(event)` returns
//! the next state and the side effects the page has to run.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::auth::dto::{Role, SignupRequest};
use crate::auth::schema::is_valid_phone_number;

pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);
pub const LOGIN_PATH: &str = "/login";

pub const MSG_NAME_REQUIRED: &str = "이름을 입력해주세요";
pub const MSG_PHONE_REQUIRED: &str = "휴대폰번호를 입력해주세요";
pub const MSG_PHONE_FORMAT: &str = "올바른 휴대폰번호 형식이 아닙니다 (010-XXXX-XXXX)";
pub const MSG_TERMS_REQUIRED: &str = "약관에 동의해야 합니다";
pub const MSG_SIGNUP_FAILED: &str = "회원가입에 실패했습니다.";
pub const MSG_SIGNUP_ERRORED: &str = "회원가입 처리 중 문제가 발생했습니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
    Name,
    PhoneNumber,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    pub name: String,
    pub phone_number: String,
    pub agree_to_terms: bool,
}

impl FormValues {
    fn with(mut self, field: Field, value: String) -> Self {
        match field {
            Field::Email => self.email = value,
            Field::Password => self.password = value,
            Field::ConfirmPassword => self.confirm_password = value,
            Field::Name => self.name = value,
            Field::PhoneNumber => self.phone_number = value,
        }
        self
    }

    fn to_request(&self) -> SignupRequest {
        SignupRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            role: self.role,
            name: self.name.clone(),
            phone_number: self.phone_number.clone(),
            agree_to_terms: self.agree_to_terms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Edit(Field, String),
    SelectRole(Role),
    SetAgreeToTerms(bool),
    Submit,
    ServerAccepted,
    ServerRejected { message: Option<String> },
    TransportFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendSignup(SignupRequest),
    RefreshSession,
    ScheduleRedirect { after: Duration, to: &'static str },
}

/// Field-level errors keyed by the JSON field name.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub values: FormValues,
    pub phase: Phase,
    pub error_message: Option<String>,
    pub info_message: Option<String>,
    pub field_errors: FieldErrors,
}

/// The subset of server rules checked before anything is sent.
pub fn validate(values: &FormValues) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if values.name.trim().is_empty() {
        errors.insert("name", MSG_NAME_REQUIRED);
    }
    if values.phone_number.trim().is_empty() {
        errors.insert("phoneNumber", MSG_PHONE_REQUIRED);
    } else if !is_valid_phone_number(&values.phone_number) {
        errors.insert("phoneNumber", MSG_PHONE_FORMAT);
    }
    if !values.agree_to_terms {
        errors.insert("agreeToTerms", MSG_TERMS_REQUIRED);
    }
    errors
}

pub fn success_message(role: Role) -> String {
    format!(
        "회원가입이 완료되었습니다. 로그인 후 {}로 이동합니다.",
        role.home_label()
    )
}

impl FormState {
    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    /// Mirrors the disabled state of the submit button.
    pub fn submit_disabled(&self) -> bool {
        let v = &self.values;
        self.is_submitting()
            || v.email.trim().is_empty()
            || v.password.trim().is_empty()
            || v.password != v.confirm_password
            || v.name.trim().is_empty()
            || v.phone_number.trim().is_empty()
            || !v.agree_to_terms
    }

    fn settle(mut self) -> Self {
        if matches!(self.phase, Phase::Succeeded | Phase::Failed) {
            self.phase = Phase::Idle;
        }
        self
    }

    pub fn apply(self, event: FormEvent) -> (FormState, Vec<Effect>) {
        match event {
            FormEvent::Edit(field, value) => {
                let mut next = self.settle();
                next.values = next.values.with(field, value);
                (next, vec![])
            }
            FormEvent::SelectRole(role) => {
                let mut next = self.settle();
                next.values.role = role;
                (next, vec![])
            }
            FormEvent::SetAgreeToTerms(agreed) => {
                let mut next = self.settle();
                next.values.agree_to_terms = agreed;
                (next, vec![])
            }
            FormEvent::Submit => {
                if self.submit_disabled() {
                    return (self, vec![]);
                }
                let mut next = FormState {
                    error_message: None,
                    info_message: None,
                    field_errors: validate(&self.values),
                    ..self
                };
                if !next.field_errors.is_empty() {
                    next.phase = Phase::Idle;
                    return (next, vec![]);
                }
                next.phase = Phase::Submitting;
                let request = next.values.to_request();
                (next, vec![Effect::SendSignup(request)])
            }
            FormEvent::ServerAccepted if self.is_submitting() => {
                let role = self.values.role;
                let next = FormState {
                    values: FormValues::default(),
                    phase: Phase::Succeeded,
                    error_message: None,
                    info_message: Some(success_message(role)),
                    field_errors: FieldErrors::new(),
                };
                (
                    next,
                    vec![
                        Effect::RefreshSession,
                        Effect::ScheduleRedirect {
                            after: REDIRECT_DELAY,
                            to: LOGIN_PATH,
                        },
                    ],
                )
            }
            FormEvent::ServerRejected { message } if self.is_submitting() => {
                let next = FormState {
                    phase: Phase::Failed,
                    error_message: Some(message.unwrap_or_else(|| MSG_SIGNUP_FAILED.to_string())),
                    ..self
                };
                (next, vec![])
            }
            FormEvent::TransportFailed if self.is_submitting() => {
                let next = FormState {
                    phase: Phase::Failed,
                    error_message: Some(MSG_SIGNUP_ERRORED.to_string()),
                    ..self
                };
                (next, vec![])
            }
            // replies that arrive when no submission is in flight
            FormEvent::ServerAccepted
            | FormEvent::ServerRejected { .. }
            | FormEvent::TransportFailed => (self, vec![]),
        }
    }
}

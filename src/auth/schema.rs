//! Request schemas for the signup and terms-agreement endpoints.
//!
//! Parsing works on the raw JSON value so that every offending field is
//! reported, not only the first one serde would trip over.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::auth::dto::{Role, SignupRequest, TermsAgreementRequest};

pub const MSG_REQUIRED: &str = "필수 입력 항목입니다";
pub const MSG_WRONG_TYPE: &str = "올바르지 않은 형식입니다";
pub const MSG_EMAIL: &str = "올바른 이메일 형식이 아닙니다";
pub const MSG_PASSWORD_LENGTH: &str = "비밀번호는 최소 8자 이상이어야 합니다";
pub const MSG_PASSWORD_CLASSES: &str = "비밀번호는 대소문자, 숫자, 특수문자를 포함해야 합니다";
pub const MSG_ROLE: &str = "역할을 선택해주세요 (학습자 또는 강사)";
pub const MSG_NAME_EMPTY: &str = "이름을 입력해주세요";
pub const MSG_NAME_TOO_LONG: &str = "이름은 50자를 초과할 수 없습니다";
pub const MSG_PHONE: &str = "올바른 휴대폰번호 형식이 아닙니다 (010-XXXX-XXXX)";
pub const MSG_TERMS: &str = "약관에 동의해야 합니다";
pub const MSG_USER_ID: &str = "올바른 사용자 ID가 아닙니다";

pub const PASSWORD_MIN_LEN: usize = 8;
pub const NAME_MAX_LEN: usize = 50;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$"
    )
    .unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^010-[0-9]{4}-[0-9]{4}$").unwrap();
    static ref UUID_RE: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    )
    .unwrap();

    // First character must come from the permitted set; each class must
    // appear before the first line terminator.
    static ref PASSWORD_LEAD_RE: Regex = Regex::new(r"^[A-Za-z0-9@$!%*?&]").unwrap();
    static ref PASSWORD_CLASS_RES: [Regex; 4] = [
        Regex::new(r"^[^\n\r\u{2028}\u{2029}]*[a-z]").unwrap(),
        Regex::new(r"^[^\n\r\u{2028}\u{2029}]*[A-Z]").unwrap(),
        Regex::new(r"^[^\n\r\u{2028}\u{2029}]*[0-9]").unwrap(),
        Regex::new(r"^[^\n\r\u{2028}\u{2029}]*[@$!%*?&]").unwrap(),
    ];
}

/// One failed rule on one request field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_RE.is_match(email)
}

pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Character-class rule for passwords, with the semantics of
/// `^(?=.*[a-z])(?=.*[A-Z])(?=.*\d)(?=.*[@$!%*?&])[A-Za-z\d@$!%*?&]`.
pub fn password_has_required_classes(password: &str) -> bool {
    PASSWORD_LEAD_RE.is_match(password)
        && PASSWORD_CLASS_RES.iter().all(|re| re.is_match(password))
}

/// String length as browsers count it.
fn js_len(s: &str) -> usize {
    s.encode_utf16().count()
}

struct Fields<'a> {
    obj: &'a Map<String, Value>,
    violations: Vec<FieldViolation>,
}

impl<'a> Fields<'a> {
    fn new(obj: &'a Map<String, Value>) -> Self {
        Self {
            obj,
            violations: Vec::new(),
        }
    }

    fn reject(&mut self, field: &str, message: &str) {
        self.violations.push(FieldViolation::new(field, message));
    }

    fn string(&mut self, field: &str) -> Option<&'a str> {
        match self.obj.get(field) {
            None => {
                self.reject(field, MSG_REQUIRED);
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.reject(field, MSG_WRONG_TYPE);
                None
            }
        }
    }

    fn boolean(&mut self, field: &str) -> Option<bool> {
        match self.obj.get(field) {
            None => {
                self.reject(field, MSG_REQUIRED);
                None
            }
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                self.reject(field, MSG_WRONG_TYPE);
                None
            }
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, Vec<FieldViolation>> {
        match value {
            Some(v) if self.violations.is_empty() => Ok(v),
            _ => Err(self.violations),
        }
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, Vec<FieldViolation>> {
    body.as_object()
        .ok_or_else(|| vec![FieldViolation::new("", MSG_WRONG_TYPE)])
}

/// Validate a signup body. Unknown keys are ignored.
pub fn parse_signup(body: &Value) -> Result<SignupRequest, Vec<FieldViolation>> {
    let mut f = Fields::new(as_object(body)?);

    let email = f.string("email");
    if let Some(email) = email {
        if !is_valid_email(email) {
            f.reject("email", MSG_EMAIL);
        }
    }

    let password = f.string("password");
    if let Some(password) = password {
        if js_len(password) < PASSWORD_MIN_LEN {
            f.reject("password", MSG_PASSWORD_LENGTH);
        }
        if !password_has_required_classes(password) {
            f.reject("password", MSG_PASSWORD_CLASSES);
        }
    }

    let role = match f.obj.get("role") {
        Some(Value::String(s)) => Role::parse(s),
        _ => None,
    };
    if role.is_none() {
        f.reject("role", MSG_ROLE);
    }

    let name = f.string("name");
    if let Some(name) = name {
        let len = js_len(name);
        if len < 1 {
            f.reject("name", MSG_NAME_EMPTY);
        } else if len > NAME_MAX_LEN {
            f.reject("name", MSG_NAME_TOO_LONG);
        }
    }

    let phone_number = f.string("phoneNumber");
    if let Some(phone) = phone_number {
        if !is_valid_phone_number(phone) {
            f.reject("phoneNumber", MSG_PHONE);
        }
    }

    let agree_to_terms = f.boolean("agreeToTerms");
    if agree_to_terms == Some(false) {
        f.reject("agreeToTerms", MSG_TERMS);
    }

    let parsed = (|| {
        Some(SignupRequest {
            email: email?.to_string(),
            password: password?.to_string(),
            role: role?,
            name: name?.to_string(),
            phone_number: phone_number?.to_string(),
            agree_to_terms: agree_to_terms?,
        })
    })();
    f.finish(parsed)
}

/// Validate a terms-agreement body.
pub fn parse_terms_agreement(body: &Value) -> Result<TermsAgreementRequest, Vec<FieldViolation>> {
    let mut f = Fields::new(as_object(body)?);

    let user_id = f.string("userId").and_then(|raw| {
        if UUID_RE.is_match(raw) {
            Uuid::parse_str(raw).ok()
        } else {
            None
        }
    });
    if user_id.is_none() && f.violations.is_empty() {
        f.reject("userId", MSG_USER_ID);
    }

    f.finish(user_id.map(|user_id| TermsAgreementRequest { user_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "email": "a@b.com",
            "password": "Abcd1234!",
            "role": "learner",
            "name": "Kim",
            "phoneNumber": "010-1234-5678",
            "agreeToTerms": true
        })
    }

    fn fields(errs: &[FieldViolation]) -> Vec<&str> {
        errs.iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn accepts_valid_signup() {
        let req = parse_signup(&valid_body()).expect("valid body");
        assert_eq!(req.email, "a@b.com");
        assert_eq!(req.role, Role::Learner);
        assert!(req.agree_to_terms);
    }

    #[test]
    fn rejects_terms_not_agreed() {
        let mut body = valid_body();
        body["agreeToTerms"] = json!(false);
        let errs = parse_signup(&body).unwrap_err();
        assert_eq!(errs, vec![FieldViolation::new("agreeToTerms", MSG_TERMS)]);
    }

    #[test]
    fn collects_every_violation() {
        let body = json!({
            "email": "nope",
            "password": "short",
            "role": "admin",
            "name": "",
            "phoneNumber": "011-1234-5678",
            "agreeToTerms": false
        });
        let errs = parse_signup(&body).unwrap_err();
        assert_eq!(
            fields(&errs),
            vec![
                "email",
                "password",
                "password",
                "role",
                "name",
                "phoneNumber",
                "agreeToTerms"
            ]
        );
    }

    #[test]
    fn missing_and_mistyped_fields() {
        let body = json!({ "email": 42, "agreeToTerms": "yes" });
        let errs = parse_signup(&body).unwrap_err();
        assert!(errs.contains(&FieldViolation::new("email", MSG_WRONG_TYPE)));
        assert!(errs.contains(&FieldViolation::new("password", MSG_REQUIRED)));
        assert!(errs.contains(&FieldViolation::new("agreeToTerms", MSG_WRONG_TYPE)));
    }

    #[test]
    fn non_object_body() {
        let errs = parse_signup(&json!([1, 2])).unwrap_err();
        assert_eq!(errs, vec![FieldViolation::new("", MSG_WRONG_TYPE)]);
    }

    #[test]
    fn phone_number_pattern() {
        assert!(is_valid_phone_number("010-1234-5678"));
        for bad in [
            "01012345678",
            "010-123-5678",
            "010-1234-56789",
            "011-1234-5678",
            " 010-1234-5678",
            "010-1234-5678\n",
            "010-١٢٣٤-5678",
        ] {
            assert!(!is_valid_phone_number(bad), "{bad:?} should fail");
        }
    }

    #[test]
    fn password_classes_may_appear_anywhere_on_the_first_line() {
        assert!(password_has_required_classes("Abcd1234!"));
        assert!(password_has_required_classes("!aB3xxxx"));
        assert!(password_has_required_classes("1234abcD$"));
    }

    #[test]
    fn password_first_character_must_be_permitted() {
        // every class present, but the first character is outside the set
        assert!(!password_has_required_classes(" Abcd1234!"));
        assert!(!password_has_required_classes("#Abcd1234!"));
        assert!(!password_has_required_classes("-Abcd1234!"));
    }

    #[test]
    fn password_missing_a_class_fails() {
        assert!(!password_has_required_classes("abcd1234!"));
        assert!(!password_has_required_classes("ABCD1234!"));
        assert!(!password_has_required_classes("Abcdefgh!"));
        assert!(!password_has_required_classes("Abcd12345"));
        assert!(!password_has_required_classes(""));
    }

    #[test]
    fn password_classes_after_a_newline_do_not_count() {
        assert!(!password_has_required_classes("Abcd1234\n!"));
        assert!(password_has_required_classes("Abcd1234!\nx"));
    }

    #[test]
    fn password_length_counts_utf16_units() {
        let mut body = valid_body();
        body["password"] = json!("Ab1!");
        let errs = parse_signup(&body).unwrap_err();
        assert_eq!(errs, vec![FieldViolation::new("password", MSG_PASSWORD_LENGTH)]);
    }

    #[test]
    fn email_syntax() {
        for ok in ["a@b.com", "first.last+tag@sub.example.co", "o'neil@ex.io"] {
            assert!(is_valid_email(ok), "{ok} should pass");
        }
        for bad in [
            "a@b",
            ".a@b.com",
            "a..b@c.com",
            "a.@b.com",
            "a@-b.com",
            "a@b.c",
            "a b@c.com",
        ] {
            assert!(!is_valid_email(bad), "{bad} should fail");
        }
    }

    #[test]
    fn name_length_bounds() {
        let mut body = valid_body();
        body["name"] = json!("가".repeat(50));
        assert!(parse_signup(&body).is_ok());
        body["name"] = json!("가".repeat(51));
        let errs = parse_signup(&body).unwrap_err();
        assert_eq!(errs, vec![FieldViolation::new("name", MSG_NAME_TOO_LONG)]);
        // whitespace-only names pass server side
        body["name"] = json!("   ");
        assert!(parse_signup(&body).is_ok());
    }

    #[test]
    fn terms_agreement_requires_hyphenated_uuid() {
        let id = Uuid::new_v4();
        let req = parse_terms_agreement(&json!({ "userId": id.to_string() })).unwrap();
        assert_eq!(req.user_id, id);

        let simple = id.simple().to_string();
        let errs = parse_terms_agreement(&json!({ "userId": simple })).unwrap_err();
        assert_eq!(errs, vec![FieldViolation::new("userId", MSG_USER_ID)]);

        let errs = parse_terms_agreement(&json!({})).unwrap_err();
        assert_eq!(errs, vec![FieldViolation::new("userId", MSG_REQUIRED)]);
    }
}

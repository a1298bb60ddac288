use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::users::dto::UserDraft;
use crate::users::repo_types::User;
use crate::users::schema::{ADDRESS_MAX_LEN, EMAIL_MAX_LEN, NAME_MAX_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    NotBlank,
    MaxLength,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub rule: Rule,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, rule: Rule, message: &str) -> Self {
        Self {
            field: field.into(),
            rule,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("validation failed: {} violation(s)", .0.len())]
pub struct ValidationErrors(pub Vec<FieldViolation>);

/// Dot-atom local part, then one or more dot-separated host labels. A top
/// level domain is not required (`admin@localhost` passes).
fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(concat!(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*",
            r"@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?",
            r"(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
        ))
        .expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn too_long(value: Option<&str>, max: usize) -> bool {
    value.map(|v| v.chars().count() > max).unwrap_or(false)
}

/// Checks a draft against the `users` column constraints, reporting every
/// violated rule. On success the draft becomes an unsaved `User`.
pub fn validate(draft: UserDraft) -> Result<User, ValidationErrors> {
    let mut violations = Vec::new();

    let name = draft.name.as_deref();
    if is_blank(name) {
        violations.push(FieldViolation::new("name", Rule::NotBlank, "Name is required"));
    }
    if too_long(name, NAME_MAX_LEN) {
        violations.push(FieldViolation::new(
            "name",
            Rule::MaxLength,
            &format!("Name must not exceed {} characters", NAME_MAX_LEN),
        ));
    }

    let email = draft.email.as_deref();
    if is_blank(email) {
        violations.push(FieldViolation::new("email", Rule::NotBlank, "Email is required"));
    } else if !email.map(is_valid_email).unwrap_or(false) {
        violations.push(FieldViolation::new("email", Rule::Email, "Email should be valid"));
    }
    if too_long(email, EMAIL_MAX_LEN) {
        violations.push(FieldViolation::new(
            "email",
            Rule::MaxLength,
            &format!("Email must not exceed {} characters", EMAIL_MAX_LEN),
        ));
    }

    if too_long(draft.address.as_deref(), ADDRESS_MAX_LEN) {
        violations.push(FieldViolation::new(
            "address",
            Rule::MaxLength,
            &format!("Address must not exceed {} characters", ADDRESS_MAX_LEN),
        ));
    }

    if !violations.is_empty() {
        return Err(ValidationErrors(violations));
    }

    Ok(User::new(
        draft.name.unwrap_or_default(),
        draft.email.unwrap_or_default(),
        draft.address,
    ))
}

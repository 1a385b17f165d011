//! Input validation shared by the credential store and the post repository.
//!
//! Validators run before any store access and collect every failing field,
//! so a request never partially applies.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::AppError;

pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const TITLE_MAX_LEN: usize = 200;
pub const BODY_MAX_LEN: usize = 50_000;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    NameEmpty,
    #[error("Name is too long (max 100 characters)")]
    NameTooLong,
    #[error("Email cannot be empty")]
    EmailEmpty,
    #[error("Email is too long (max 254 characters)")]
    EmailTooLong,
    #[error("Invalid email format")]
    EmailInvalidFormat,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Password is too long (max 128 characters)")]
    PasswordTooLong,
    #[error("Title cannot be empty")]
    TitleEmpty,
    #[error("Title is too long (max 200 characters)")]
    TitleTooLong,
    #[error("Body cannot be empty")]
    BodyEmpty,
    #[error("Body is too long (max 50000 characters)")]
    BodyTooLong,
}

impl ValidationError {
    /// The request field this error belongs to.
    pub fn field(self) -> &'static str {
        match self {
            Self::NameEmpty | Self::NameTooLong => "name",
            Self::EmailEmpty | Self::EmailTooLong | Self::EmailInvalidFormat => "email",
            Self::PasswordTooShort | Self::PasswordTooLong => "password",
            Self::TitleEmpty | Self::TitleTooLong => "title",
            Self::BodyEmpty | Self::BodyTooLong => "body",
        }
    }
}

/// Field name to message, serialized as a JSON object under `details.fields`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first error reported for a field.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn record(&mut self, result: Result<(), ValidationError>) {
        if let Err(err) = result {
            self.insert(err.field(), err.to_string());
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::NameEmpty);
    }

    if trimmed.chars().count() > NAME_MAX_LEN {
        return Err(ValidationError::NameTooLong);
    }

    Ok(())
}

/// Expects an already normalized address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }

    if email.len() > EMAIL_MAX_LEN {
        return Err(ValidationError::EmailTooLong);
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();

    if len < PASSWORD_MIN_LEN {
        return Err(ValidationError::PasswordTooShort);
    }

    if len > PASSWORD_MAX_LEN {
        return Err(ValidationError::PasswordTooLong);
    }

    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }

    if trimmed.chars().count() > TITLE_MAX_LEN {
        return Err(ValidationError::TitleTooLong);
    }

    Ok(())
}

pub fn validate_body(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::BodyEmpty);
    }

    if body.chars().count() > BODY_MAX_LEN {
        return Err(ValidationError::BodyTooLong);
    }

    Ok(())
}

//! Request and response bodies for the account operations

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Log-in-or-register request
///
/// Bounds are in UTF-8 bytes, not characters.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LogInRequest {
    #[validate(custom(function = "username_length"))]
    pub username: String,

    #[validate(custom(function = "password_length"))]
    pub password: String,
}

fn username_length(username: &str) -> Result<(), ValidationError> {
    byte_length(username, 2, 24, "Username must be 2-24 bytes")
}

fn password_length(password: &str) -> Result<(), ValidationError> {
    byte_length(password, 3, 25, "Password must be 3-25 bytes")
}

fn byte_length(value: &str, min: usize, max: usize, message: &'static str) -> Result<(), ValidationError> {
    if (min..=max).contains(&value.len()) {
        Ok(())
    } else {
        Err(ValidationError::new("length").with_message(Cow::Borrowed(message)))
    }
}

impl LogInRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Token handed back by a successful log-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogInResponse {
    pub token: String,
}

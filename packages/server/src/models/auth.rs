use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Email address, used as the login name.
    #[schema(example = "user@example.com")]
    pub email: String,
    /// Password (at least 8 characters once surrounding spaces are ignored). Stored exactly as sent.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = email.len() <= 320
        && !email.chars().any(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
    if !valid {
        return Err(AppError::Validation("Email address is not valid".into()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.trim().chars().count();
    if !(8..=128).contains(&len) {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub id: Uuid,
    #[schema(example = "user@example.com")]
    pub email: String,
}

impl From<crate::entity::user::Model> for RegisterResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// The authenticated principal.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    pub id: Uuid,
    #[schema(example = "admin@example.com")]
    pub email: String,
    pub is_superuser: bool,
}

/// A freshly issued CSRF token. The same value is set as the `csrftoken` cookie.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CsrfResponse {
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015")]
    pub csrf_token: String,
}

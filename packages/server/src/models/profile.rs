use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::user_profile;
use crate::error::AppError;
use crate::models::shared::{sanitize_optional, sanitize_text, validate_length};

/// Full profile contents. Every save replaces all fields.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ProfileRequest {
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
    #[schema(example = "female")]
    pub gender: Option<String>,
    #[schema(example = "1815-12-10")]
    pub date_of_birth: Option<NaiveDate>,
    #[schema(example = "+44 20 7946 0958")]
    pub phone: Option<String>,
    #[schema(example = "London")]
    pub city: Option<String>,
    #[schema(example = "United Kingdom")]
    pub country: Option<String>,
}

fn validate_optional(label: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => validate_length(label, v, 1, max),
        _ => Ok(()),
    }
}

pub fn validate_profile(payload: &ProfileRequest) -> Result<(), AppError> {
    validate_length("First name", &payload.first_name, 1, 100)?;
    validate_length("Last name", &payload.last_name, 1, 100)?;
    validate_optional("Gender", payload.gender.as_deref(), 32)?;
    validate_optional("City", payload.city.as_deref(), 100)?;
    validate_optional("Country", payload.country.as_deref(), 100)?;

    if let Some(phone) = payload.phone.as_deref().map(str::trim)
        && !phone.is_empty()
    {
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let allowed = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
        if !allowed || !(5..=20).contains(&digits) {
            return Err(AppError::Validation("Phone number is not valid".into()));
        }
    }

    if let Some(dob) = payload.date_of_birth
        && dob > Utc::now().date_naive()
    {
        return Err(AppError::Validation(
            "Date of birth cannot be in the future".into(),
        ));
    }
    Ok(())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProfileRequest {
    pub fn sanitized(self) -> Self {
        Self {
            first_name: sanitize_text(&self.first_name),
            last_name: sanitize_text(&self.last_name),
            gender: sanitize_optional(self.gender),
            date_of_birth: self.date_of_birth,
            phone: sanitize_optional(self.phone),
            city: sanitize_optional(self.city),
            country: sanitize_optional(self.country),
        }
    }

    pub fn into_active_model(self) -> user_profile::ActiveModel {
        user_profile::ActiveModel {
            first_name: Set(self.first_name.trim().to_string()),
            last_name: Set(self.last_name.trim().to_string()),
            gender: Set(clean(self.gender)),
            date_of_birth: Set(self.date_of_birth),
            phone: Set(clean(self.phone)),
            city: Set(clean(self.city)),
            country: Set(clean(self.country)),
            ..Default::default()
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<user_profile::Model> for ProfileResponse {
    fn from(m: user_profile::Model) -> Self {
        Self {
            id: m.id,
            first_name: m.first_name,
            last_name: m.last_name,
            gender: m.gender,
            date_of_birth: m.date_of_birth,
            phone: m.phone,
            city: m.city,
            country: m.country,
            updated_at: m.updated_at,
        }
    }
}

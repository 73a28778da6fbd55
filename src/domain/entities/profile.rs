use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// ───── Constants ──────────────────────────────────────────────────────
pub const MAX_NAME_LENGTH: u64 = 200;
pub const MAX_EMAIL_LENGTH: u64 = 200;
pub const MAX_PHONE_LENGTH: u64 = 200;
pub const MAX_SUMMARY_LENGTH: u64 = 2000;
pub const MAX_PREVIOUS_WORK_LENGTH: u64 = 1000;
pub const MAX_SKILLS_LENGTH: u64 = 1000;

pub const PROFILE_FIELDS: [&str; 6] = ["name", "email", "phone", "summary", "previous_work", "skills"];

// ───── Database Models ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub summary: String,
    pub previous_work: String,
    pub skills: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileInsert {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub summary: String,
    pub previous_work: String,
    pub skills: String,
}

// ───── Input & Validation ───────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(
        custom(function = "required"),
        length(max = MAX_NAME_LENGTH, code = "field_too_long", message = "Ensure this value has at most 200 characters.")
    )]
    pub name: String,

    #[validate(
        custom(function = "required"),
        length(max = MAX_EMAIL_LENGTH, code = "field_too_long", message = "Ensure this value has at most 200 characters."),
        email(message = "Enter a valid email address.")
    )]
    pub email: String,

    #[validate(
        custom(function = "required"),
        length(max = MAX_PHONE_LENGTH, code = "field_too_long", message = "Ensure this value has at most 200 characters.")
    )]
    pub phone: String,

    #[validate(
        custom(function = "required"),
        length(max = MAX_SUMMARY_LENGTH, code = "field_too_long", message = "Ensure this value has at most 2000 characters.")
    )]
    pub summary: String,

    #[validate(
        custom(function = "required"),
        length(max = MAX_PREVIOUS_WORK_LENGTH, code = "field_too_long", message = "Ensure this value has at most 1000 characters.")
    )]
    pub previous_work: String,

    #[validate(
        custom(function = "required"),
        length(max = MAX_SKILLS_LENGTH, code = "field_too_long", message = "Ensure this value has at most 1000 characters.")
    )]
    pub skills: String,
}

impl ProfileForm {
    /// Assigns a posted value to the matching field; unknown keys are ignored.
    pub fn set_field(&mut self, key: &str, value: String) -> bool {
        let slot = match key {
            "name" => &mut self.name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "summary" => &mut self.summary,
            "previous_work" => &mut self.previous_work,
            "skills" => &mut self.skills,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn prepare_for_insert(&self) -> ProfileInsert {
        ProfileInsert {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            summary: self.summary.trim().to_string(),
            previous_work: self.previous_work.trim().to_string(),
            skills: self.skills.trim().to_string(),
        }
    }
}

impl From<&Profile> for ProfileForm {
    fn from(profile: &Profile) -> Self {
        ProfileForm {
            name: profile.name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            summary: profile.summary.clone(),
            previous_work: profile.previous_work.clone(),
            skills: profile.skills.clone(),
        }
    }
}

// ───── Validation Helpers ───────────────────────────────────────────

pub fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(new_validation_error("required", "This field is required."));
    }
    Ok(())
}

pub(crate) fn new_validation_error(code: &'static str, msg: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(msg));
    err
}

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::profile::required;

pub const MAX_DEGREE_LENGTH: u64 = 200;
pub const MAX_UNIVERSITY_LENGTH: u64 = 200;
pub const MAX_GRADUATION_YEAR_LENGTH: u64 = 4;
pub const MAX_GPA_LENGTH: u64 = 10;
pub const MAX_DESCRIPTION_LENGTH: u64 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Education {
    pub id: i64,
    pub profile_id: i64,
    pub degree: String,
    pub university: String,
    pub graduation_year: Option<String>,
    pub gpa: Option<String>,
    pub description: Option<String>,
    #[sqlx(rename = "display_order")]
    pub order: i32,
}

impl Education {
    /// Display ordering: `order`, then graduation year (missing years last), then id.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| cmp_year(&self.graduation_year, &other.graduation_year))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Byte order; `list_educations` sorts with `COLLATE "C"` to match.
fn cmp_year(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_for_display(educations: &mut [Education]) {
    educations.sort_by(Education::display_cmp);
}

/// A validated education row ready to be written; `id` is `None` for new rows.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct EducationUpsert {
    pub id: Option<i64>,

    #[validate(
        custom(function = "required"),
        length(max = MAX_DEGREE_LENGTH, code = "field_too_long", message = "Ensure this value has at most 200 characters.")
    )]
    pub degree: String,

    #[validate(
        custom(function = "required"),
        length(max = MAX_UNIVERSITY_LENGTH, code = "field_too_long", message = "Ensure this value has at most 200 characters.")
    )]
    pub university: String,

    #[validate(length(max = MAX_GRADUATION_YEAR_LENGTH, code = "field_too_long", message = "Ensure this value has at most 4 characters."))]
    pub graduation_year: Option<String>,

    #[validate(length(max = MAX_GPA_LENGTH, code = "field_too_long", message = "Ensure this value has at most 10 characters."))]
    pub gpa: Option<String>,

    #[validate(length(max = MAX_DESCRIPTION_LENGTH, code = "field_too_long", message = "Ensure this value has at most 500 characters."))]
    pub description: Option<String>,

    pub order: i32,
}

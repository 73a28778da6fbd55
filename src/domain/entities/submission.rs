//! Binding of a profile form together with its variable-length list of
//! education slots (`education-{index}-{field}`), and the all-or-nothing
//! validation pass that turns a submission into an explicit write diff.

use std::collections::BTreeMap;

use serde::Serialize;
use validator::Validate;

use crate::{
    entities::{
        education::{Education, EducationUpsert},
        profile::{ProfileForm, ProfileInsert, PROFILE_FIELDS},
    },
    errors::{field_errors, FieldError},
};

pub const EDUCATION_PREFIX: &str = "education";
pub const EDUCATION_FIELDS: [&str; 8] = [
    "id", "degree", "university", "graduation_year", "gpa", "description", "order", "DELETE",
];
pub const MAX_EXTRA_SLOTS: usize = 20;
/// Highest slot index bound from a form; keys beyond it are ignored.
pub const MAX_SLOT_INDEX: usize = 999;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EducationSlot {
    pub index: usize,
    pub id: String,
    pub degree: String,
    pub university: String,
    pub graduation_year: String,
    pub gpa: String,
    pub description: String,
    pub order: String,
    pub delete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotAction {
    Skip,
    Delete(i64),
    Upsert(EducationUpsert),
}

impl EducationSlot {
    pub fn blank(index: usize) -> Self {
        EducationSlot {
            index,
            ..Default::default()
        }
    }

    pub fn from_education(index: usize, education: &Education) -> Self {
        EducationSlot {
            index,
            id: education.id.to_string(),
            degree: education.degree.clone(),
            university: education.university.clone(),
            graduation_year: education.graduation_year.clone().unwrap_or_default(),
            gpa: education.gpa.clone().unwrap_or_default(),
            description: education.description.clone().unwrap_or_default(),
            order: education.order.to_string(),
            delete: false,
        }
    }

    pub fn prefix(&self) -> String {
        format!("{}-{}-", EDUCATION_PREFIX, self.index)
    }

    fn set_field(&mut self, field: &str, value: String) {
        match field {
            "id" => self.id = value,
            "degree" => self.degree = value,
            "university" => self.university = value,
            "graduation_year" => self.graduation_year = value,
            "gpa" => self.gpa = value,
            "description" => self.description = value,
            "order" => self.order = value,
            f if f.eq_ignore_ascii_case("delete") => self.delete = is_checked(&value),
            _ => {}
        }
    }

    /// An untouched extra slot: no id and nothing typed in (an `order` of 0 is the default).
    pub fn is_blank(&self) -> bool {
        self.id.trim().is_empty()
            && self.degree.trim().is_empty()
            && self.university.trim().is_empty()
            && self.graduation_year.trim().is_empty()
            && self.gpa.trim().is_empty()
            && self.description.trim().is_empty()
            && matches!(self.order.trim(), "" | "0")
    }

    pub fn classify(&self) -> Result<SlotAction, Vec<FieldError>> {
        let prefix = self.prefix();
        let mut errors = Vec::new();

        let id = match self.id.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    errors.push(FieldError {
                        field: format!("{prefix}id"),
                        message: "Select a valid choice.".to_string(),
                    });
                    None
                }
            },
        };

        if self.delete {
            return match (id, errors.is_empty()) {
                (Some(id), true) => Ok(SlotAction::Delete(id)),
                (None, true) => Ok(SlotAction::Skip),
                _ => Err(errors),
            };
        }

        if self.is_blank() {
            return Ok(SlotAction::Skip);
        }

        let order = match self.order.trim() {
            "" => 0,
            raw => raw.parse::<i32>().unwrap_or_else(|_| {
                errors.push(FieldError {
                    field: format!("{prefix}order"),
                    message: "Enter a whole number.".to_string(),
                });
                0
            }),
        };

        let upsert = EducationUpsert {
            id,
            degree: self.degree.trim().to_string(),
            university: self.university.trim().to_string(),
            graduation_year: non_empty(&self.graduation_year),
            gpa: non_empty(&self.gpa),
            description: non_empty(&self.description),
            order,
        };

        if let Err(e) = upsert.validate() {
            errors.extend(field_errors(&e, &prefix));
        }

        if errors.is_empty() {
            Ok(SlotAction::Upsert(upsert))
        } else {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(errors)
        }
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "on" | "true" | "1" | "yes")
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Diff applied to a profile's education set inside the submission transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EducationChanges {
    pub upserts: Vec<EducationUpsert>,
    pub deletes: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub profile_id: Option<i64>,
    pub profile: ProfileInsert,
    pub changes: EducationChanges,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileSubmission {
    pub profile: ProfileForm,
    pub educations: Vec<EducationSlot>,
}

impl ProfileSubmission {
    /// Binds raw form pairs. Slots are ordered by index; gaps are allowed.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut profile = ProfileForm::default();
        let mut slots: BTreeMap<usize, EducationSlot> = BTreeMap::new();

        for (key, value) in pairs {
            if let Some((index, field)) = parse_slot_key(&key) {
                slots
                    .entry(index)
                    .or_insert_with(|| EducationSlot::blank(index))
                    .set_field(field, value);
            } else {
                profile.set_field(&key, value);
            }
        }

        ProfileSubmission {
            profile,
            educations: slots.into_values().collect(),
        }
    }

    /// Validates the profile and every slot; any error rejects the whole submission.
    ///
    /// On create (`profile_id == None`) posted education ids are discarded so a
    /// new profile can never claim rows that belong to another one.
    pub fn validate(mut self, profile_id: Option<i64>) -> Result<ValidatedSubmission, FormState> {
        if profile_id.is_none() {
            for slot in &mut self.educations {
                slot.id.clear();
            }
        }

        let mut errors = match self.profile.validate() {
            Ok(()) => Vec::new(),
            Err(e) => {
                let mut errors = field_errors(&e, "");
                errors.sort_by(|a, b| a.field.cmp(&b.field));
                errors
            }
        };

        let mut changes = EducationChanges::default();
        for slot in &self.educations {
            match slot.classify() {
                Ok(SlotAction::Skip) => {}
                Ok(SlotAction::Delete(id)) => changes.deletes.push(id),
                Ok(SlotAction::Upsert(upsert)) => changes.upserts.push(upsert),
                Err(slot_errors) => errors.extend(slot_errors),
            }
        }

        if !errors.is_empty() {
            return Err(FormState {
                profile: self.profile,
                educations: self.educations,
                errors,
            });
        }

        Ok(ValidatedSubmission {
            profile_id,
            profile: self.profile.prepare_for_insert(),
            changes,
        })
    }
}

fn parse_slot_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix(EDUCATION_PREFIX)?.strip_prefix('-')?;
    let (index, field) = rest.split_once('-')?;
    let index = index.parse::<usize>().ok().filter(|i| *i <= MAX_SLOT_INDEX)?;
    EDUCATION_FIELDS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(field))
        .then_some((index, field))
}

// ───── Redisplay ────────────────────────────────────────────────────

/// The original input plus error annotations, used to redisplay the form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormState {
    pub profile: ProfileForm,
    pub educations: Vec<EducationSlot>,
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: EducationSlot,
    pub prefix: String,
    pub errors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct FormView {
    pub profile: ProfileForm,
    pub profile_errors: BTreeMap<String, Vec<String>>,
    pub educations: Vec<SlotView>,
    pub next_index: usize,
    pub has_errors: bool,
}

impl FormState {
    pub fn new(profile: ProfileForm, educations: Vec<EducationSlot>) -> Self {
        FormState {
            profile,
            educations,
            errors: Vec::new(),
        }
    }

    /// Appends `count` blank slots after the highest index in use.
    pub fn with_blank_slots(mut self, count: usize) -> Self {
        let start = self.next_index();
        self.educations
            .extend((start..start.saturating_add(count.min(MAX_EXTRA_SLOTS))).map(EducationSlot::blank));
        self
    }

    pub fn next_index(&self) -> usize {
        self.educations.iter().map(|s| s.index.saturating_add(1)).max().unwrap_or(0)
    }

    pub fn errors_for(&self, field: &str) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Template-friendly shape: every field key is present, even without errors.
    pub fn view(&self) -> FormView {
        let profile_errors = PROFILE_FIELDS
            .iter()
            .map(|field| (field.to_string(), self.errors_for(field)))
            .collect();

        let educations = self
            .educations
            .iter()
            .map(|slot| {
                let prefix = slot.prefix();
                let errors = EDUCATION_FIELDS
                    .iter()
                    .map(|field| (field.to_string(), self.errors_for(&format!("{prefix}{field}"))))
                    .collect();
                SlotView {
                    slot: slot.clone(),
                    prefix,
                    errors,
                }
            })
            .collect();

        FormView {
            profile: self.profile.clone(),
            profile_errors,
            educations,
            next_index: self.next_index(),
            has_errors: !self.errors.is_empty(),
        }
    }
}

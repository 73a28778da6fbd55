use validator::Validate;

use crate::{
    entities::{
        education::{sort_for_display, Education},
        profile::{Profile, ProfileForm},
        submission::{EducationSlot, FormState, ProfileSubmission, MAX_EXTRA_SLOTS},
    },
    errors::AppError,
    repositories::profile::ProfileRepository,
};

#[derive(Debug)]
pub enum SubmissionOutcome {
    /// Persisted; carries the profile id to redirect to
    Saved(i64),
    /// Rejected; nothing was written
    Invalid(FormState),
}

/// Loads a profile with its educations in display order.
pub async fn load_profile<R>(repo: &R, id: i64) -> Result<(Profile, Vec<Education>), AppError>
where
    R: ProfileRepository + ?Sized,
{
    let (profile, mut educations) =
        futures::try_join!(repo.get_profile(id), repo.list_educations(id))?;

    let profile = profile.ok_or_else(|| AppError::NotFound(format!("Profile {}", id)))?;
    sort_for_display(&mut educations);

    Ok((profile, educations))
}

pub struct ProfileHandler<R>
where
    R: ProfileRepository,
{
    pub profile_repo: R,
    pub blank_slots: usize,
}

impl<R> ProfileHandler<R>
where
    R: ProfileRepository,
{
    pub fn new(profile_repo: R, blank_slots: usize) -> Self {
        ProfileHandler {
            profile_repo,
            blank_slots,
        }
    }

    fn slot_count(&self, extra: Option<usize>) -> usize {
        extra.unwrap_or(self.blank_slots).min(MAX_EXTRA_SLOTS)
    }

    /// An empty creation form with at least one blank education slot
    pub fn blank_form(&self, extra: Option<usize>) -> FormState {
        FormState::new(ProfileForm::default(), Vec::new())
            .with_blank_slots(self.slot_count(extra).max(1))
    }

    /// The edit form: stored values, stored educations, then blank slots
    pub async fn edit_form(&self, id: i64, extra: Option<usize>) -> Result<FormState, AppError> {
        let (profile, educations) = load_profile(&self.profile_repo, id).await?;

        let slots = educations
            .iter()
            .enumerate()
            .map(|(index, education)| EducationSlot::from_education(index, education))
            .collect();

        Ok(FormState::new(ProfileForm::from(&profile), slots).with_blank_slots(self.slot_count(extra)))
    }

    /// Validates the profile together with its education slots and, only if
    /// everything passes, writes both in a single transaction.
    pub async fn submit(
        &self,
        profile_id: Option<i64>,
        submission: ProfileSubmission,
    ) -> Result<SubmissionOutcome, AppError> {
        if let Some(id) = profile_id {
            if self.profile_repo.get_profile(id).await?.is_none() {
                return Err(AppError::NotFound(format!("Profile {}", id)));
            }
        }

        let validated = match submission.validate(profile_id) {
            Ok(validated) => validated,
            Err(state) => {
                tracing::info!(
                    profile_id = ?profile_id,
                    errors = state.errors.len(),
                    "Profile submission rejected"
                );
                return Ok(SubmissionOutcome::Invalid(state));
            }
        };

        let id = self.profile_repo.save_submission(&validated).await?;
        Ok(SubmissionOutcome::Saved(id))
    }

    /// Creates a bare profile without educations
    pub async fn create_profile(&self, form: &ProfileForm) -> Result<i64, AppError> {
        form.validate()?;
        self.profile_repo.create_profile(&form.prepare_for_insert()).await
    }

    pub async fn get_profile(&self, id: i64) -> Result<(Profile, Vec<Education>), AppError> {
        load_profile(&self.profile_repo, id).await
    }

    pub async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        self.profile_repo.delete_profile(id).await?;
        tracing::info!(profile_id = id, "Profile deleted");
        Ok(())
    }
}

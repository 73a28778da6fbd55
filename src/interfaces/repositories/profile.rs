use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

#[cfg(test)]
use mockall::automock;

use crate::{
    entities::{
        education::{Education, EducationUpsert},
        profile::{Profile, ProfileInsert},
        submission::ValidatedSubmission,
    },
    errors::AppError,
    repositories::sqlx_repo::SqlxProfileRepo,
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;

    /// Inserts a single profile row without touching educations
    async fn create_profile(&self, profile: &ProfileInsert) -> Result<i64, AppError>;

    async fn get_profile(&self, id: i64) -> Result<Option<Profile>, AppError>;

    /// Educations of a profile, ordered by (order, graduation_year)
    async fn list_educations(&self, profile_id: i64) -> Result<Vec<Education>, AppError>;

    /// Upserts `entries` and deletes `to_delete`, all scoped to `profile_id`
    async fn save_education_set(
        &self,
        profile_id: i64,
        entries: &[EducationUpsert],
        to_delete: &[i64],
    ) -> Result<(), AppError>;

    /// Writes the profile and its education diff in one transaction
    async fn save_submission(&self, submission: &ValidatedSubmission) -> Result<i64, AppError>;

    /// Deletes the profile; its educations go with it
    async fn delete_profile(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
impl<T: ProfileRepository + ?Sized> ProfileRepository for Arc<T> {
    async fn check_connection(&self) -> Result<(), AppError> {
        (**self).check_connection().await
    }

    async fn create_profile(&self, profile: &ProfileInsert) -> Result<i64, AppError> {
        (**self).create_profile(profile).await
    }

    async fn get_profile(&self, id: i64) -> Result<Option<Profile>, AppError> {
        (**self).get_profile(id).await
    }

    async fn list_educations(&self, profile_id: i64) -> Result<Vec<Education>, AppError> {
        (**self).list_educations(profile_id).await
    }

    async fn save_education_set(
        &self,
        profile_id: i64,
        entries: &[EducationUpsert],
        to_delete: &[i64],
    ) -> Result<(), AppError> {
        (**self).save_education_set(profile_id, entries, to_delete).await
    }

    async fn save_submission(&self, submission: &ValidatedSubmission) -> Result<i64, AppError> {
        (**self).save_submission(submission).await
    }

    async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        (**self).delete_profile(id).await
    }
}

impl SqlxProfileRepo {
    pub fn new(pool: sqlx::PgPool) -> Self {
        SqlxProfileRepo { pool }
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(AppError::from)
    }

    async fn create_profile(&self, profile: &ProfileInsert) -> Result<i64, AppError> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_profile(&mut conn, profile).await?;
        Ok(id)
    }

    async fn get_profile(&self, id: i64) -> Result<Option<Profile>, AppError> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, name, email, phone, summary, previous_work, skills, created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_educations(&self, profile_id: i64) -> Result<Vec<Education>, AppError> {
        let educations = sqlx::query_as::<_, Education>(
            r#"
            SELECT id, profile_id, degree, university, graduation_year, gpa, description, display_order
            FROM educations
            WHERE profile_id = $1
            ORDER BY display_order ASC, graduation_year COLLATE "C" ASC NULLS LAST, id ASC
            "#,
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(educations)
    }

    async fn save_education_set(
        &self,
        profile_id: i64,
        entries: &[EducationUpsert],
        to_delete: &[i64],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(transaction_failure)?;

        match apply_education_changes(&mut tx, profile_id, entries, to_delete).await {
            Ok(()) => {
                tx.commit().await.map_err(transaction_failure)?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!("Rollback of education set for profile {} failed: {}", profile_id, rollback);
                }
                Err(into_transaction_error(e))
            }
        }
    }

    async fn save_submission(&self, submission: &ValidatedSubmission) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await.map_err(transaction_failure)?;

        match apply_submission(&mut tx, submission).await {
            Ok(id) => {
                tx.commit().await.map_err(transaction_failure)?;
                tracing::info!(
                    profile_id = id,
                    upserts = submission.changes.upserts.len(),
                    deletes = submission.changes.deletes.len(),
                    "Profile submission committed"
                );
                Ok(id)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!("Rollback of profile submission failed: {}", rollback);
                }
                Err(into_transaction_error(e))
            }
        }
    }

    async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Profile {}", id)));
        }

        Ok(())
    }
}

// ───── Transaction Steps ────────────────────────────────────────────

async fn apply_submission(
    conn: &mut PgConnection,
    submission: &ValidatedSubmission,
) -> Result<i64, AppError> {
    let profile_id = match submission.profile_id {
        Some(id) => {
            update_profile(conn, id, &submission.profile).await?;
            id
        }
        None => insert_profile(conn, &submission.profile).await?,
    };

    apply_education_changes(
        conn,
        profile_id,
        &submission.changes.upserts,
        &submission.changes.deletes,
    )
    .await?;

    Ok(profile_id)
}

async fn insert_profile(conn: &mut PgConnection, profile: &ProfileInsert) -> Result<i64, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO profiles (name, email, phone, summary, previous_work, skills)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&profile.name)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(&profile.summary)
    .bind(&profile.previous_work)
    .bind(&profile.skills)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

async fn update_profile(
    conn: &mut PgConnection,
    id: i64,
    profile: &ProfileInsert,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE profiles
        SET
            name = $2,
            email = $3,
            phone = $4,
            summary = $5,
            previous_work = $6,
            skills = $7,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&profile.name)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(&profile.summary)
    .bind(&profile.previous_work)
    .bind(&profile.skills)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Profile {}", id)));
    }

    Ok(())
}

/// Deletes first, then creates/updates, every statement scoped to `profile_id`.
async fn apply_education_changes(
    conn: &mut PgConnection,
    profile_id: i64,
    entries: &[EducationUpsert],
    to_delete: &[i64],
) -> Result<(), AppError> {
    if !to_delete.is_empty() {
        sqlx::query("DELETE FROM educations WHERE profile_id = $1 AND id = ANY($2)")
            .bind(profile_id)
            .bind(to_delete)
            .execute(&mut *conn)
            .await?;
    }

    for entry in entries {
        match entry.id {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO educations
                        (profile_id, degree, university, graduation_year, gpa, description, display_order)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(profile_id)
                .bind(&entry.degree)
                .bind(&entry.university)
                .bind(&entry.graduation_year)
                .bind(&entry.gpa)
                .bind(&entry.description)
                .bind(entry.order)
                .execute(&mut *conn)
                .await?;
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE educations
                    SET
                        degree = $3,
                        university = $4,
                        graduation_year = $5,
                        gpa = $6,
                        description = $7,
                        display_order = $8
                    WHERE id = $1 AND profile_id = $2
                    "#,
                )
                .bind(id)
                .bind(profile_id)
                .bind(&entry.degree)
                .bind(&entry.university)
                .bind(&entry.graduation_year)
                .bind(&entry.gpa)
                .bind(&entry.description)
                .bind(entry.order)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound(format!(
                        "Education entry {} of profile {}",
                        id, profile_id
                    )));
                }
            }
        }
    }

    Ok(())
}

fn transaction_failure(err: sqlx::Error) -> AppError {
    AppError::TransactionFailure(err.to_string())
}

fn into_transaction_error(err: AppError) -> AppError {
    match err {
        AppError::NotFound(_) | AppError::TransactionFailure(_) => err,
        other => AppError::TransactionFailure(other.to_string()),
    }
}

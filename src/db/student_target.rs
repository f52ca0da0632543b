//! Destination folders for student submissions, keyed by teacher email.

use super::DbPool;
use crate::Result;

/// Repository for student upload targets.
pub struct StudentTargetRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> StudentTargetRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get the submission folder for a teacher, if one is configured.
    pub async fn get_folder(&self, teacher_email: &str) -> Result<Option<String>> {
        let folder = sqlx::query_scalar::<_, String>(
            "SELECT folder_id FROM student_upload_targets WHERE email = $1",
        )
        .bind(teacher_email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// Set the submission folder for a teacher (administrative provisioning).
    pub async fn set_folder(&self, teacher_email: &str, folder_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO student_upload_targets (email, folder_id) VALUES ($1, $2)
             ON CONFLICT(email) DO UPDATE SET folder_id = excluded.folder_id",
        )
        .bind(teacher_email)
        .bind(folder_id)
        .execute(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(())
    }
}

//! Maps teachers to their drive folders.

use crate::db::{Database, StudentTargetRepository, TeacherRecord, TeacherRepository};
use crate::{AppError, Result};

/// Read-only lookups of teacher folder mappings.
#[derive(Clone)]
pub struct FolderResolver {
    db: Database,
}

impl FolderResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Teacher record by email, or `NotFound("teacher")`.
    pub async fn teacher(&self, email: &str) -> Result<TeacherRecord> {
        TeacherRepository::new(self.db.pool())
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("teacher".to_string()))
    }

    /// Root folder of a teacher's materials.
    pub async fn resolve_teacher_folder(&self, email: &str) -> Result<String> {
        Ok(self.teacher(email).await?.folder_id)
    }

    /// Folder receiving student submissions for a teacher.
    ///
    /// `None` when no target is configured yet.
    pub async fn resolve_student_upload_folder(&self, email: &str) -> Result<Option<String>> {
        StudentTargetRepository::new(self.db.pool())
            .get_folder(email)
            .await
    }

    /// Destination for a student submission.
    ///
    /// Same as [`Self::resolve_student_upload_folder`], but a target that points
    /// at the teacher's materials folder is refused with [`AppError::Config`].
    pub async fn student_submission_folder(&self, email: &str) -> Result<Option<String>> {
        let Some(folder_id) = self.resolve_student_upload_folder(email).await? else {
            return Ok(None);
        };

        let teacher = TeacherRepository::new(self.db.pool())
            .get_by_email(email)
            .await?;
        if teacher.is_some_and(|t| t.folder_id == folder_id) {
            tracing::error!(
                teacher = %email,
                folder_id = %folder_id,
                "Student upload target is the materials folder"
            );
            return Err(AppError::Config(format!(
                "student upload folder for {email} is the materials folder"
            )));
        }
        Ok(Some(folder_id))
    }

    /// Active teachers, ordered by name.
    pub async fn list_active_teachers(&self) -> Result<Vec<TeacherRecord>> {
        TeacherRepository::new(self.db.pool()).list_active().await
    }
}

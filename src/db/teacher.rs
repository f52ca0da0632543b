//! Teacher directory.
//!
//! Records are provisioned by an administrator. The request path only reads them.

use serde::Serialize;

use super::DbPool;
use crate::Result;

/// A teacher and the root folder of their materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TeacherRecord {
    pub email: String,
    /// Remote drive folder holding the teacher's materials.
    pub folder_id: String,
    pub name: String,
    pub active: bool,
}

/// Repository for teacher records.
pub struct TeacherRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> TeacherRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a teacher by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<TeacherRecord>> {
        let teacher = sqlx::query_as::<_, TeacherRecord>(
            "SELECT email, folder_id, name, active FROM teachers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(teacher)
    }

    /// List active teachers ordered by name.
    pub async fn list_active(&self) -> Result<Vec<TeacherRecord>> {
        let teachers = sqlx::query_as::<_, TeacherRecord>(
            "SELECT email, folder_id, name, active FROM teachers
             WHERE active = 1 ORDER BY name, email",
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(teachers)
    }

    /// Insert or replace a teacher record (administrative provisioning).
    pub async fn upsert(&self, teacher: &TeacherRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO teachers (email, folder_id, name, active) VALUES ($1, $2, $3, $4)
             ON CONFLICT(email) DO UPDATE SET
                folder_id = excluded.folder_id,
                name = excluded.name,
                active = excluded.active",
        )
        .bind(&teacher.email)
        .bind(&teacher.folder_id)
        .bind(&teacher.name)
        .bind(teacher.active)
        .execute(self.pool)
        .await
        .map_err(|e| crate::AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn teacher(email: &str, name: &str, active: bool) -> TeacherRecord {
        TeacherRecord {
            email: email.to_string(),
            folder_id: format!("folder-{name}"),
            name: name.to_string(),
            active,
        }
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = TeacherRepository::new(db.pool());
        let ana = teacher("ana@school.example", "Ana", true);

        repo.upsert(&ana).await.unwrap();

        assert_eq!(repo.get_by_email("ana@school.example").await.unwrap(), Some(ana));
        assert!(repo.get_by_email("ben@school.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_email_ignores_case() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = TeacherRepository::new(db.pool());

        repo.upsert(&teacher("Ana.Lopez@School.example", "Ana", true))
            .await
            .unwrap();

        let found = repo.get_by_email("ana.lopez@school.example").await.unwrap();
        assert_eq!(found.unwrap().name, "Ana");

        // Same key in another case updates rather than duplicates.
        repo.upsert(&teacher("ANA.LOPEZ@SCHOOL.EXAMPLE", "Ana L.", true))
            .await
            .unwrap();
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_active_skips_inactive() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = TeacherRepository::new(db.pool());

        repo.upsert(&teacher("zoe@school.example", "Zoe", true)).await.unwrap();
        repo.upsert(&teacher("ana@school.example", "Ana", true)).await.unwrap();
        repo.upsert(&teacher("old@school.example", "Old", false)).await.unwrap();

        let names: Vec<String> = repo
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Zoe"]);
    }

    #[tokio::test]
    async fn test_upsert_updates_existing() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = TeacherRepository::new(db.pool());

        repo.upsert(&teacher("ana@school.example", "Ana", true)).await.unwrap();
        let mut moved = teacher("ana@school.example", "Ana", true);
        moved.folder_id = "folder-new".to_string();
        repo.upsert(&moved).await.unwrap();

        let stored = repo.get_by_email("ana@school.example").await.unwrap().unwrap();
        assert_eq!(stored.folder_id, "folder-new");
    }
}

//! Database schema and migrations.
//!
//! Migrations are applied in order the first time the database is opened
//! or after an upgrade. The `schema_version` table records which ones ran.

/// Database migrations.
/// Email keys compare without case, matching the teacher allow-list.
pub const MIGRATIONS: &[&str] = &[
    // v1: Teacher directory and student upload targets
    r#"
-- Teachers, provisioned by an administrator
CREATE TABLE teachers (
    email       TEXT PRIMARY KEY COLLATE NOCASE,
    folder_id   TEXT NOT NULL,           -- root of the teacher's materials
    name        TEXT NOT NULL,
    active      INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX idx_teachers_active ON teachers(active);

-- Where student submissions for a teacher are written
CREATE TABLE student_upload_targets (
    email       TEXT PRIMARY KEY COLLATE NOCASE,
    folder_id   TEXT NOT NULL
);
"#,
    // v2: Refresh credentials from teacher logins
    r#"
CREATE TABLE refresh_credentials (
    email           TEXT PRIMARY KEY COLLATE NOCASE,
    refresh_token   TEXT NOT NULL,
    updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v3: Server-side sessions
    r#"
CREATE TABLE sessions (
    id          TEXT PRIMARY KEY,
    data        TEXT NOT NULL,           -- JSON encoded session state
    expires_at  INTEGER NOT NULL,        -- unix seconds
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
"#,
];

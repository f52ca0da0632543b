//! Teacher allow-list.

use std::collections::HashSet;

/// Emails permitted to use the teacher area. Matching ignores case.
///
/// An empty list admits nobody.
#[derive(Debug, Clone, Default)]
pub struct TeacherAllowlist {
    emails: HashSet<String>,
}

impl TeacherAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_allowed(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

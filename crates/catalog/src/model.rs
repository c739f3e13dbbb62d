//! Catalog Row Types
//!
//! Shapes of the `courses` and `student_progress` tables as the data
//! API returns them. Optional columns stay optional: the catalog is
//! curated by hand and rows are not uniformly filled in.

use serde::Deserialize;
use uuid::Uuid;

/// A course catalog row
#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub total_lessons: Option<u32>,
}

/// A student's progress row for one course
#[derive(Debug, Clone, Deserialize)]
pub struct StudentProgress {
    pub user_id: Uuid,
    pub course_id: Uuid,
    #[serde(default)]
    pub completed_lessons: u32,
    /// Completion percentage, 0-100
    #[serde(default)]
    pub progress: u8,
}

impl StudentProgress {
    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}

use std::path::Path;

use learn_core::model::{Course, CourseId};

use super::document::CourseDocument;
use crate::error::CatalogError;

/// Courses loaded from a JSON file holding an array of course documents.
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    courses: Vec<Course>,
}

impl CourseCatalog {
    /// Parses a JSON array of course documents.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Json` for malformed JSON, or the validation error
    /// of the first invalid course.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let docs: Vec<CourseDocument> = serde_json::from_str(raw)?;
        let courses = docs
            .into_iter()
            .map(CourseDocument::into_course)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { courses })
    }

    /// Reads and parses a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, otherwise the
    /// same errors as `from_json_str`.
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&raw)
    }

    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Looks a course up by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no course has that id.
    pub fn get(&self, id: &CourseId) -> Result<&Course, CatalogError> {
        self.courses
            .iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }
}

//! Shared error types for the services crate.

use thiserror::Error;

use learn_core::model::{CertificateError, CourseId, ProgressError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("course {0} has no quiz")]
    NoQuiz(CourseId),
    #[error("finish the remaining {remaining} lessons before taking the quiz")]
    LessonsIncomplete { remaining: usize },
    #[error("quiz attempt has not been submitted yet")]
    NotSubmitted,
    #[error("quiz attempt does not belong to course {0}")]
    AttemptMismatch(CourseId),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

/// Errors emitted by `CertificateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateServiceError {
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    #[error("failed to write certificate: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors emitted by the course catalog (REST or local file).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("invalid API base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("{message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("course document is missing its id")]
    MissingId,
    #[error("course {0} not found")]
    NotFound(CourseId),
    #[error("invalid course document: {0}")]
    InvalidCourse(#[from] learn_core::error::Error),
    #[error("invalid course JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

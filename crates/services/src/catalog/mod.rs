mod client;
mod document;
mod local;

pub use client::{CatalogClient, CatalogConfig, GENERIC_ERROR_MESSAGE};
pub use document::{
    CourseDocument, DEFAULT_PASSING_PERCENTAGE, LessonDocument, QuestionDocument,
};
pub use local::CourseCatalog;

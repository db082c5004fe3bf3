#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog;
pub mod certificate_service;
pub mod error;
pub mod interaction_tracker;
pub mod progress_service;
pub mod quiz_service;

pub use learn_core::Clock;

pub use app_services::AppServices;
pub use catalog::{CatalogClient, CatalogConfig, CourseCatalog, CourseDocument};
pub use certificate_service::CertificateService;
pub use error::{
    AppServicesError, CatalogError, CertificateServiceError, ProgressServiceError,
    QuizServiceError,
};
pub use interaction_tracker::InteractionTracker;
pub use progress_service::{LessonCompletion, ProgressService};
pub use quiz_service::{QuizService, QuizSubmission};

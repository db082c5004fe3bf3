use std::sync::Arc;

use storage::repository::{KeyLayout, Storage};

use crate::Clock;
use crate::catalog::{CatalogClient, CatalogConfig};
use crate::certificate_service::CertificateService;
use crate::error::AppServicesError;
use crate::interaction_tracker::InteractionTracker;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;

/// Assembles the learner-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    interactions: Arc<InteractionTracker>,
    quiz: Arc<QuizService>,
    certificates: Arc<CertificateService>,
    catalog: Option<Arc<CatalogClient>>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        layout: KeyLayout,
        clock: Clock,
        catalog: Option<CatalogConfig>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, layout).await?;
        Ok(Self::from_storage(&storage, clock, catalog))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, catalog: Option<CatalogConfig>) -> Self {
        let progress = Arc::new(ProgressService::new(clock, Arc::clone(&storage.progress)));
        let interactions = Arc::new(InteractionTracker::new(
            clock,
            Arc::clone(&storage.interactions),
        ));
        let quiz = Arc::new(QuizService::new(
            Arc::clone(&progress),
            Arc::clone(&interactions),
        ));
        let certificates = Arc::new(CertificateService::new(
            clock,
            Arc::clone(&progress),
            Arc::clone(&interactions),
        ));
        let catalog = catalog.map(|config| Arc::new(CatalogClient::new(config)));

        Self {
            progress,
            interactions,
            quiz,
            certificates,
            catalog,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn interactions(&self) -> Arc<InteractionTracker> {
        Arc::clone(&self.interactions)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn certificates(&self) -> Arc<CertificateService> {
        Arc::clone(&self.certificates)
    }

    #[must_use]
    pub fn catalog(&self) -> Option<Arc<CatalogClient>> {
        self.catalog.as_ref().map(Arc::clone)
    }
}

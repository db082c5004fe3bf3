use std::path::{Path, PathBuf};
use std::sync::Arc;

use learn_core::model::{
    Certificate, CertificateId, Course, CourseId, InteractionKind, can_show_certificate,
};
use tracing::info;

use crate::Clock;
use crate::error::CertificateServiceError;
use crate::interaction_tracker::InteractionTracker;
use crate::progress_service::ProgressService;

/// Issues and exports the cosmetic completion certificate.
///
/// Everything happens locally; the displayed score is taken from stored
/// progress without any server-side check.
#[derive(Clone)]
pub struct CertificateService {
    clock: Clock,
    progress: Arc<ProgressService>,
    tracker: Arc<InteractionTracker>,
}

impl CertificateService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<ProgressService>,
        tracker: Arc<InteractionTracker>,
    ) -> Self {
        Self {
            clock,
            progress,
            tracker,
        }
    }

    pub async fn can_show(&self, course: &CourseId) -> bool {
        can_show_certificate(&self.progress.load(course).await)
    }

    /// Builds the certificate for `display_name`.
    ///
    /// # Errors
    ///
    /// Returns `CertificateServiceError::Certificate` when the quiz has not
    /// been passed or the name is blank.
    pub async fn issue(
        &self,
        course: &Course,
        display_name: &str,
    ) -> Result<Certificate, CertificateServiceError> {
        let progress = self.progress.load_for(course).await;
        let certificate = Certificate::issue(
            CertificateId::generate(),
            course.title(),
            &progress,
            display_name,
            self.clock.now(),
        )?;

        self.tracker
            .record(course.id(), InteractionKind::CertificateIssued)
            .await;
        info!(course = %course.id(), certificate = %certificate.id(), "certificate issued");
        Ok(certificate)
    }

    /// Writes the rendered SVG to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `CertificateServiceError::Io` if the file cannot be written.
    pub async fn export_svg(
        &self,
        certificate: &Certificate,
        path: &Path,
    ) -> Result<PathBuf, CertificateServiceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, certificate.render_svg()).await?;
        Ok(path.to_path_buf())
    }
}

/// Default export file name, e.g. `certificate-rust-101.svg`.
#[must_use]
pub fn default_file_name(course: &CourseId) -> String {
    let slug: String = course
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("certificate-{slug}.svg")
}

use std::sync::Arc;

use learn_core::model::{Course, CourseId, CourseProgress, LessonGate, QuizOutcome};
use storage::repository::{ProgressRepository, WriteMode};
use tracing::{debug, warn};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Result of marking a lesson complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCompletion {
    pub progress: CourseProgress,
    /// `false` when the lesson had already been completed.
    pub newly_completed: bool,
    /// Set when this completion finished the last outstanding lesson.
    pub quiz_unlocked: bool,
}

/// Loads and persists per-course learner progress.
///
/// Storage failures never reach the caller through `load`/`save`: they are
/// logged and the learner keeps an un-persisted session.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, repo }
    }

    /// Saved progress for a course, or the zero state if there is none or it
    /// cannot be read.
    pub async fn load(&self, course: &CourseId) -> CourseProgress {
        match self.repo.load_progress(course).await {
            Ok(saved) => saved.value.unwrap_or_default(),
            Err(err) => {
                warn!(course = %course, error = %err, "failed to load course progress, using defaults");
                CourseProgress::new()
            }
        }
    }

    /// Like `load`, reconciled against the course's current lesson list.
    pub async fn load_for(&self, course: &Course) -> CourseProgress {
        let mut progress = self.load(course.id()).await;
        if progress.reconcile(course.lesson_count()) {
            debug!(course = %course.id(), "reconciled stale progress against lesson list");
        }
        progress
    }

    /// Stamps `last_accessed` and persists. Write failures are logged; the
    /// stamped record is returned either way.
    pub async fn save(&self, course: &CourseId, progress: CourseProgress) -> CourseProgress {
        let mut stamped = progress;
        stamped.touch(self.clock.now());
        if let Err(err) = self
            .repo
            .save_progress(course, &stamped, WriteMode::Overwrite)
            .await
        {
            warn!(course = %course, error = %err, "failed to persist course progress");
        }
        stamped
    }

    /// Stamps `last_accessed` and persists, surfacing storage errors.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the write fails.
    pub async fn try_save(
        &self,
        course: &CourseId,
        progress: CourseProgress,
    ) -> Result<CourseProgress, ProgressServiceError> {
        let mut stamped = progress;
        stamped.touch(self.clock.now());
        self.repo
            .save_progress(course, &stamped, WriteMode::Overwrite)
            .await?;
        Ok(stamped)
    }

    /// Marks a lesson complete. Re-completing a lesson is a no-op apart from
    /// refreshing `last_accessed`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` if the lesson does not exist or
    /// is still locked.
    pub async fn complete_lesson(
        &self,
        course: &Course,
        index: usize,
    ) -> Result<LessonCompletion, ProgressServiceError> {
        let mut progress = self.load_for(course).await;
        let was_unlocked = gate(&progress, course).quiz_unlocked();
        gate(&progress, course).check_access(index)?;

        let newly_completed = progress.mark_lesson_complete(index);
        let quiz_unlocked = !was_unlocked && gate(&progress, course).quiz_unlocked();
        let progress = self.save(course.id(), progress).await;
        debug!(course = %course.id(), lesson = index, newly_completed, "lesson completed");

        Ok(LessonCompletion {
            progress,
            newly_completed,
            quiz_unlocked,
        })
    }

    /// Moves the learner to another lesson, refusing forward skips.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` if the lesson does not exist or
    /// is still locked.
    pub async fn navigate_to(
        &self,
        course: &Course,
        index: usize,
    ) -> Result<CourseProgress, ProgressServiceError> {
        let mut progress = self.load_for(course).await;
        gate(&progress, course).check_access(index)?;
        progress.set_current_lesson(index);
        Ok(self.save(course.id(), progress).await)
    }

    /// Records a passed quiz. A lower score never replaces a better one.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for an out-of-range score.
    pub async fn record_quiz_pass(
        &self,
        course: &Course,
        outcome: &QuizOutcome,
    ) -> Result<CourseProgress, ProgressServiceError> {
        let mut progress = self.load_for(course).await;
        let percentage = outcome.percentage();
        let best = progress.quiz_score().map_or(percentage, |prev| prev.max(percentage));
        progress.complete_quiz(best)?;
        Ok(self.save(course.id(), progress).await)
    }

    /// Adds study time to the course total.
    pub async fn add_time_spent(&self, course: &CourseId, seconds: u64) -> CourseProgress {
        let mut progress = self.load(course).await;
        progress.add_time_spent(seconds);
        self.save(course, progress).await
    }

    /// Wipes saved progress for a course.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the delete fails.
    pub async fn reset(&self, course: &CourseId) -> Result<(), ProgressServiceError> {
        self.repo.delete_progress(course).await?;
        Ok(())
    }
}

fn gate<'a>(progress: &'a CourseProgress, course: &Course) -> LessonGate<'a> {
    LessonGate::new(progress, course.lesson_count(), course.has_quiz())
}

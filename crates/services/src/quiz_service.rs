use std::sync::Arc;

use learn_core::model::{
    Course, CourseProgress, InteractionKind, LessonGate, Quiz, QuizAttempt, QuizOutcome,
};
use tracing::info;

use crate::error::QuizServiceError;
use crate::interaction_tracker::InteractionTracker;
use crate::progress_service::ProgressService;

/// Result of handing a finished attempt to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSubmission {
    pub outcome: QuizOutcome,
    /// Updated progress when the attempt passed; `None` for a failed attempt.
    pub progress: Option<CourseProgress>,
}

impl QuizSubmission {
    #[must_use]
    pub fn certificate_unlocked(&self) -> bool {
        self.progress
            .as_ref()
            .is_some_and(CourseProgress::quiz_completed)
    }
}

/// Gates access to the course quiz and records passing attempts.
#[derive(Clone)]
pub struct QuizService {
    progress: Arc<ProgressService>,
    tracker: Arc<InteractionTracker>,
}

impl QuizService {
    #[must_use]
    pub fn new(progress: Arc<ProgressService>, tracker: Arc<InteractionTracker>) -> Self {
        Self { progress, tracker }
    }

    /// Opens a fresh attempt once every lesson is complete.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NoQuiz` if the course has no quiz, or
    /// `QuizServiceError::LessonsIncomplete` while lessons remain.
    pub async fn start(&self, course: &Course) -> Result<QuizAttempt, QuizServiceError> {
        let quiz = self.unlocked_quiz(course).await?;
        self.tracker
            .record(course.id(), InteractionKind::QuizStarted)
            .await;
        Ok(QuizAttempt::start(quiz))
    }

    /// Accepts a submitted attempt. Passing is the only event that reaches
    /// progress (and therefore the certificate gate). The lesson gate is
    /// checked again here, so an attempt built outside `start` cannot skip it.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotSubmitted` for an attempt still in
    /// progress, `QuizServiceError::AttemptMismatch` if the attempt was taken
    /// on another quiz, the same errors as `start` while the quiz is locked,
    /// or `QuizServiceError::Progress` if the score is rejected.
    pub async fn submit(
        &self,
        course: &Course,
        attempt: &QuizAttempt,
    ) -> Result<QuizSubmission, QuizServiceError> {
        let quiz = self.unlocked_quiz(course).await?;
        if quiz != attempt.quiz() {
            return Err(QuizServiceError::AttemptMismatch(course.id().clone()));
        }
        let outcome = attempt.outcome().ok_or(QuizServiceError::NotSubmitted)?;
        self.tracker
            .record(course.id(), InteractionKind::QuizSubmitted)
            .await;

        if !outcome.passed {
            return Ok(QuizSubmission {
                outcome,
                progress: None,
            });
        }

        let progress = self.progress.record_quiz_pass(course, &outcome).await?;
        info!(
            course = %course.id(),
            score = outcome.score,
            total = outcome.total_marks,
            "quiz passed"
        );
        Ok(QuizSubmission {
            outcome,
            progress: Some(progress),
        })
    }

    async fn unlocked_quiz<'c>(&self, course: &'c Course) -> Result<&'c Quiz, QuizServiceError> {
        let quiz = course
            .quiz()
            .ok_or_else(|| QuizServiceError::NoQuiz(course.id().clone()))?;

        let progress = self.progress.load_for(course).await;
        let gate = LessonGate::new(&progress, course.lesson_count(), true);
        if !gate.quiz_unlocked() {
            let remaining = course
                .lesson_count()
                .saturating_sub(progress.completed_lessons().len());
            return Err(QuizServiceError::LessonsIncomplete { remaining });
        }
        Ok(quiz)
    }
}

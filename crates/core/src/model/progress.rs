use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("lesson {index} does not exist (course has {count} lessons)")]
    LessonOutOfRange { index: usize, count: usize },

    #[error("lesson {index} is locked until earlier lessons are completed")]
    LessonLocked { index: usize },

    #[error("quiz score must be between 0 and 100, got {0}")]
    InvalidScore(u8),
}

//
// ─── COURSE PROGRESS ───────────────────────────────────────────────────────────
//

/// Per-course learner progress as persisted on the client.
///
/// The JSON field names match the layout written by the web front-end so the
/// same blob can be read by either side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseProgress {
    current_lesson_index: usize,
    completed_lessons: BTreeSet<usize>,
    quiz_completed: bool,
    quiz_score: u8,
    last_accessed: Option<DateTime<Utc>>,
    total_time_spent: u64,
}

impl CourseProgress {
    /// Zero state for a course the learner has never opened.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current_lesson_index(&self) -> usize {
        self.current_lesson_index
    }

    #[must_use]
    pub fn completed_lessons(&self) -> &BTreeSet<usize> {
        &self.completed_lessons
    }

    #[must_use]
    pub fn is_lesson_completed(&self, index: usize) -> bool {
        self.completed_lessons.contains(&index)
    }

    #[must_use]
    pub fn quiz_completed(&self) -> bool {
        self.quiz_completed
    }

    /// Percentage score of the passed quiz; `None` until the quiz is completed.
    #[must_use]
    pub fn quiz_score(&self) -> Option<u8> {
        self.quiz_completed.then_some(self.quiz_score)
    }

    #[must_use]
    pub fn last_accessed(&self) -> Option<DateTime<Utc>> {
        self.last_accessed
    }

    /// Seconds spent in the course across all sessions.
    #[must_use]
    pub fn total_time_spent(&self) -> u64 {
        self.total_time_spent
    }

    /// Marks a lesson complete. Returns `false` if it already was.
    pub fn mark_lesson_complete(&mut self, index: usize) -> bool {
        self.completed_lessons.insert(index)
    }

    pub fn set_current_lesson(&mut self, index: usize) {
        self.current_lesson_index = index;
    }

    /// Records a passed quiz.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidScore` for a percentage above 100.
    pub fn complete_quiz(&mut self, percentage: u8) -> Result<(), ProgressError> {
        if percentage > 100 {
            return Err(ProgressError::InvalidScore(percentage));
        }
        self.quiz_completed = true;
        self.quiz_score = percentage;
        Ok(())
    }

    pub fn add_time_spent(&mut self, seconds: u64) {
        self.total_time_spent = self.total_time_spent.saturating_add(seconds);
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_accessed = Some(at);
    }

    /// Brings a record loaded from storage back in line with the course's
    /// current lesson list.
    ///
    /// Completed indices beyond the lesson count are dropped and the current
    /// lesson is clamped. Returns `true` if anything changed.
    pub fn reconcile(&mut self, lesson_count: usize) -> bool {
        let before = self.completed_lessons.len();
        self.completed_lessons.retain(|&i| i < lesson_count);
        let mut changed = before != self.completed_lessons.len();

        let max_index = lesson_count.saturating_sub(1);
        if self.current_lesson_index > max_index {
            self.current_lesson_index = max_index;
            changed = true;
        }
        if !self.quiz_completed && self.quiz_score != 0 {
            self.quiz_score = 0;
            changed = true;
        }
        if self.quiz_score > 100 {
            self.quiz_score = 100;
            changed = true;
        }
        changed
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

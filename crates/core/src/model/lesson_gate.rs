use crate::model::progress::{CourseProgress, ProgressError};

/// Read-only view deciding which lessons a learner may open.
#[derive(Debug, Clone, Copy)]
pub struct LessonGate<'a> {
    progress: &'a CourseProgress,
    lesson_count: usize,
    has_quiz: bool,
}

impl<'a> LessonGate<'a> {
    #[must_use]
    pub fn new(progress: &'a CourseProgress, lesson_count: usize, has_quiz: bool) -> Self {
        Self {
            progress,
            lesson_count,
            has_quiz,
        }
    }

    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.lesson_count
    }

    /// Denominator of the percentage: the lesson count, or 1 for a quiz-only
    /// course so the division stays defined.
    #[must_use]
    pub fn total_units(&self) -> usize {
        if self.lesson_count > 0 {
            self.lesson_count
        } else if self.has_quiz {
            1
        } else {
            0
        }
    }

    /// Rounded share of completed lessons (0..=100). A passed quiz does not
    /// count.
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        let total = self.total_units();
        if total == 0 {
            return 0;
        }
        let done = self.completed_lessons_in_range().min(total);
        let pct = (done * 200 + total) / (total * 2);
        u8::try_from(pct).unwrap_or(100)
    }

    #[must_use]
    pub fn all_lessons_completed(&self) -> bool {
        self.completed_lessons_in_range() == self.lesson_count
    }

    fn completed_lessons_in_range(&self) -> usize {
        self.progress
            .completed_lessons()
            .iter()
            .filter(|&&i| i < self.lesson_count)
            .count()
    }

    #[must_use]
    pub fn quiz_unlocked(&self) -> bool {
        self.has_quiz && self.all_lessons_completed()
    }

    /// True if `index` was already visited, or every lesson before it is
    /// complete.
    #[must_use]
    pub fn can_advance_to(&self, index: usize) -> bool {
        if index >= self.lesson_count {
            return false;
        }
        if index <= self.progress.current_lesson_index() {
            return true;
        }
        (0..index).all(|i| self.progress.is_lesson_completed(i))
    }

    /// Same as `can_advance_to`, with the reason when it is refused.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::LessonOutOfRange` or `ProgressError::LessonLocked`.
    pub fn check_access(&self, index: usize) -> Result<(), ProgressError> {
        if index >= self.lesson_count {
            return Err(ProgressError::LessonOutOfRange {
                index,
                count: self.lesson_count,
            });
        }
        if !self.can_advance_to(index) {
            return Err(ProgressError::LessonLocked { index });
        }
        Ok(())
    }

    /// First lesson not yet completed.
    #[must_use]
    pub fn next_lesson(&self) -> Option<usize> {
        (0..self.lesson_count).find(|&i| !self.progress.is_lesson_completed(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_with(completed: &[usize]) -> CourseProgress {
        let mut p = CourseProgress::new();
        for &i in completed {
            p.mark_lesson_complete(i);
        }
        p
    }

    #[test]
    fn quarter_complete_is_25_percent() {
        let p = progress_with(&[0]);
        assert_eq!(LessonGate::new(&p, 4, true).progress_percentage(), 25);
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        let p = progress_with(&[0]);
        assert_eq!(LessonGate::new(&p, 3, false).progress_percentage(), 33);
        let p = progress_with(&[0, 1]);
        assert_eq!(LessonGate::new(&p, 3, false).progress_percentage(), 67);
    }

    #[test]
    fn empty_course_is_zero_percent() {
        let p = CourseProgress::new();
        let gate = LessonGate::new(&p, 0, false);
        assert_eq!(gate.total_units(), 0);
        assert_eq!(gate.progress_percentage(), 0);
    }

    #[test]
    fn quiz_only_course_stays_at_zero_percent() {
        let mut p = CourseProgress::new();
        assert_eq!(LessonGate::new(&p, 0, true).total_units(), 1);
        assert_eq!(LessonGate::new(&p, 0, true).progress_percentage(), 0);
        p.complete_quiz(90).unwrap();
        assert_eq!(LessonGate::new(&p, 0, true).progress_percentage(), 0);
        assert!(LessonGate::new(&p, 0, true).quiz_unlocked());
    }

    #[test]
    fn completing_last_lesson_unlocks_quiz() {
        let mut p = progress_with(&[0, 1]);
        {
            let gate = LessonGate::new(&p, 3, true);
            assert!(!gate.all_lessons_completed());
            assert!(!gate.quiz_unlocked());
        }
        p.mark_lesson_complete(2);
        let gate = LessonGate::new(&p, 3, true);
        assert!(gate.all_lessons_completed());
        assert!(gate.quiz_unlocked());
        assert_eq!(gate.next_lesson(), None);
    }

    #[test]
    fn no_forward_skip_past_incomplete_lesson() {
        let p = progress_with(&[0]);
        let gate = LessonGate::new(&p, 4, false);
        assert!(gate.can_advance_to(0));
        assert!(gate.can_advance_to(1));
        assert!(!gate.can_advance_to(2));
        assert_eq!(gate.check_access(2), Err(ProgressError::LessonLocked { index: 2 }));
        assert_eq!(
            gate.check_access(4),
            Err(ProgressError::LessonOutOfRange { index: 4, count: 4 })
        );
    }

    #[test]
    fn visited_lessons_stay_reachable() {
        let mut p = CourseProgress::new();
        p.set_current_lesson(2);
        let gate = LessonGate::new(&p, 4, false);
        assert!(gate.can_advance_to(1));
        assert!(gate.can_advance_to(2));
        assert!(!gate.can_advance_to(3));
    }
}

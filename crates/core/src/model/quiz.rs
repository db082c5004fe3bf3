use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised while building a quiz definition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizDefinitionError {
    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("question {index} has empty text")]
    EmptyQuestion { index: usize },

    #[error("question {index} needs at least two answers")]
    TooFewAnswers { index: usize },

    #[error("question {index} marks the answer {correct} as correct but only has {len} answers")]
    CorrectAnswerOutOfRange {
        index: usize,
        correct: usize,
        len: usize,
    },

    #[error("question {index} must be worth at least one mark")]
    ZeroMarks { index: usize },

    #[error("passing percentage must be between 0 and 100, got {0}")]
    InvalidPassingPercentage(u8),
}

/// Errors raised while a learner works through a quiz attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("select an answer before moving on")]
    Unanswered,

    #[error("answer {index} does not exist for this question ({len} answers)")]
    AnswerOutOfRange { index: usize, len: usize },

    #[error("quiz attempt has already been submitted")]
    AlreadySubmitted,
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question with a mark weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    answers: Vec<String>,
    correct_answer_index: usize,
    marks: u32,
}

impl Question {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        answers: Vec<String>,
        correct_answer_index: usize,
        marks: u32,
    ) -> Self {
        Self {
            text: text.into(),
            answers,
            correct_answer_index,
            marks,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    #[must_use]
    pub fn correct_answer_index(&self) -> usize {
        self.correct_answer_index
    }

    #[must_use]
    pub fn marks(&self) -> u32 {
        self.marks
    }

    fn validate(&self, index: usize) -> Result<(), QuizDefinitionError> {
        if self.text.trim().is_empty() {
            return Err(QuizDefinitionError::EmptyQuestion { index });
        }
        if self.answers.len() < 2 {
            return Err(QuizDefinitionError::TooFewAnswers { index });
        }
        if self.correct_answer_index >= self.answers.len() {
            return Err(QuizDefinitionError::CorrectAnswerOutOfRange {
                index,
                correct: self.correct_answer_index,
                len: self.answers.len(),
            });
        }
        if self.marks == 0 {
            return Err(QuizDefinitionError::ZeroMarks { index });
        }
        Ok(())
    }
}

/// An ordered question set plus the percentage needed to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    questions: Vec<Question>,
    passing_percentage: u8,
}

impl Quiz {
    /// Validates and builds a quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizDefinitionError` if there are no questions, a question is
    /// malformed, or the passing percentage exceeds 100.
    pub fn new(questions: Vec<Question>, passing_percentage: u8) -> Result<Self, QuizDefinitionError> {
        if questions.is_empty() {
            return Err(QuizDefinitionError::NoQuestions);
        }
        if passing_percentage > 100 {
            return Err(QuizDefinitionError::InvalidPassingPercentage(
                passing_percentage,
            ));
        }
        for (index, question) in questions.iter().enumerate() {
            question.validate(index)?;
        }
        Ok(Self {
            questions,
            passing_percentage,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn passing_percentage(&self) -> u8 {
        self.passing_percentage
    }

    /// Sum of all question marks.
    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.marks))
    }

    /// `round(passing_percentage / 100 * total_marks)`, halves rounded up.
    #[must_use]
    pub fn passing_mark(&self) -> u32 {
        let scaled = u64::from(self.passing_percentage) * u64::from(self.total_marks());
        let rounded = (scaled * 2 + 100) / 200;
        u32::try_from(rounded).unwrap_or(u32::MAX)
    }

    /// Scores a full answer sheet. Unanswered entries earn nothing.
    #[must_use]
    pub fn score(&self, answers: &[Option<usize>]) -> QuizOutcome {
        let score = self
            .questions
            .iter()
            .zip(answers.iter())
            .filter(|(q, a)| **a == Some(q.correct_answer_index))
            .fold(0_u32, |acc, (q, _)| acc.saturating_add(q.marks));
        let correct_count = self
            .questions
            .iter()
            .zip(answers.iter())
            .filter(|(q, a)| **a == Some(q.correct_answer_index))
            .count();

        let passing_mark = self.passing_mark();
        QuizOutcome {
            score,
            total_marks: self.total_marks(),
            passing_mark,
            correct_count,
            passed: score >= passing_mark,
        }
    }
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Result of a submitted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub score: u32,
    pub total_marks: u32,
    pub passing_mark: u32,
    pub correct_count: usize,
    pub passed: bool,
}

impl QuizOutcome {
    /// Score as a rounded percentage of the total marks (0..=100).
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.total_marks == 0 {
            return 0;
        }
        let pct = (u64::from(self.score) * 200 + u64::from(self.total_marks))
            / (u64::from(self.total_marks) * 2);
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}

//
// ─── ATTEMPT STATE MACHINE ─────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    InProgress { current: usize },
    Submitted(QuizOutcome),
}

/// What happened after a successful `next()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStep {
    Advanced { current: usize },
    Submitted(QuizOutcome),
}

/// One learner's pass through a quiz. Lives only for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    quiz: Quiz,
    answers: Vec<Option<usize>>,
    phase: QuizPhase,
}

impl QuizAttempt {
    #[must_use]
    pub fn start(quiz: &Quiz) -> Self {
        Self {
            answers: vec![None; quiz.question_count()],
            quiz: quiz.clone(),
            phase: QuizPhase::InProgress { current: 0 },
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    /// Index of the question on screen, or `None` once submitted.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            QuizPhase::InProgress { current } => Some(current),
            QuizPhase::Submitted(_) => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.quiz.questions.get(i))
    }

    #[must_use]
    pub fn outcome(&self) -> Option<QuizOutcome> {
        match self.phase {
            QuizPhase::Submitted(outcome) => Some(outcome),
            QuizPhase::InProgress { .. } => None,
        }
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_index()
            .is_some_and(|i| i + 1 == self.quiz.question_count())
    }

    /// Records (or replaces) the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` after submission and
    /// `QuizError::AnswerOutOfRange` for an invalid answer index.
    pub fn select_answer(&mut self, answer: usize) -> Result<(), QuizError> {
        let current = self.in_progress()?;
        let len = self.quiz.questions[current].answers.len();
        if answer >= len {
            return Err(QuizError::AnswerOutOfRange { index: answer, len });
        }
        self.answers[current] = Some(answer);
        Ok(())
    }

    /// Moves forward; past the last question this scores the attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unanswered` if the current question has no answer,
    /// or `QuizError::AlreadySubmitted` after submission.
    pub fn next(&mut self) -> Result<QuizStep, QuizError> {
        let current = self.in_progress()?;
        if self.answers[current].is_none() {
            return Err(QuizError::Unanswered);
        }

        if current + 1 < self.quiz.question_count() {
            self.phase = QuizPhase::InProgress {
                current: current + 1,
            };
            return Ok(QuizStep::Advanced {
                current: current + 1,
            });
        }

        let outcome = self.quiz.score(&self.answers);
        self.phase = QuizPhase::Submitted(outcome);
        Ok(QuizStep::Submitted(outcome))
    }

    /// Moves back one question, keeping stored answers. No-op on the first
    /// question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadySubmitted` after submission.
    pub fn previous(&mut self) -> Result<usize, QuizError> {
        let current = self.in_progress()?;
        let target = current.saturating_sub(1);
        self.phase = QuizPhase::InProgress { current: target };
        Ok(target)
    }

    /// Full reset: back to question 0 with every answer cleared.
    pub fn restart(&mut self) {
        self.answers.iter_mut().for_each(|a| *a = None);
        self.phase = QuizPhase::InProgress { current: 0 };
    }

    fn in_progress(&self) -> Result<usize, QuizError> {
        match self.phase {
            QuizPhase::InProgress { current } => Ok(current),
            QuizPhase::Submitted(_) => Err(QuizError::AlreadySubmitted),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

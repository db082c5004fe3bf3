use thiserror::Error;

use crate::model::ids::CourseId;
use crate::model::quiz::Quiz;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("lesson {index} has an empty title")]
    EmptyLessonTitle { index: usize },
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single unit of course material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    title: String,
    body: Option<String>,
    media_url: Option<String>,
}

impl Lesson {
    #[must_use]
    pub fn new(title: impl Into<String>, body: Option<String>, media_url: Option<String>) -> Self {
        Self {
            title: title.into(),
            body,
            media_url,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref()
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course as seen by the learner: an ordered lesson list plus an optional
/// final quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    lessons: Vec<Lesson>,
    quiz: Option<Quiz>,
}

impl Course {
    /// Creates a course after validating titles.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the course title is blank, or
    /// `CourseError::EmptyLessonTitle` if any lesson title is blank.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        lessons: Vec<Lesson>,
        quiz: Option<Quiz>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if let Some(index) = lessons.iter().position(|l| l.title.trim().is_empty()) {
            return Err(CourseError::EmptyLessonTitle { index });
        }

        Ok(Self {
            id,
            title,
            description: description.filter(|d| !d.trim().is_empty()),
            lessons,
            quiz,
        })
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn lesson(&self, index: usize) -> Option<&Lesson> {
        self.lessons.get(index)
    }

    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn has_quiz(&self) -> bool {
        self.quiz.is_some()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

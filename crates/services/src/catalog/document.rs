use learn_core::model::{Course, CourseId, Lesson, Question, Quiz};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Passing percentage applied when a course document does not set one.
pub const DEFAULT_PASSING_PERCENTAGE: u8 = 50;

/// Course payload as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDocument {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub lessons: Vec<LessonDocument>,
    #[serde(default)]
    pub quiz: Vec<QuestionDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_percentage: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDocument {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDocument {
    pub question: String,
    pub answers: Vec<String>,
    pub correct_answer: usize,
    #[serde(default = "default_marks")]
    pub marks: u32,
}

fn default_marks() -> u32 {
    1
}

impl CourseDocument {
    /// Validates the payload into a domain `Course`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingId` for a document without an id, or
    /// `CatalogError::InvalidCourse` if the course or quiz fails validation.
    pub fn into_course(self) -> Result<Course, CatalogError> {
        let raw_id = self.id.ok_or(CatalogError::MissingId)?;
        let id = CourseId::new(raw_id).map_err(|_| CatalogError::MissingId)?;

        let lessons = self
            .lessons
            .into_iter()
            .map(|l| Lesson::new(l.title, l.content, l.video_url))
            .collect();

        let quiz = if self.quiz.is_empty() {
            None
        } else {
            let questions = self
                .quiz
                .into_iter()
                .map(|q| Question::new(q.question, q.answers, q.correct_answer, q.marks))
                .collect();
            let passing = self
                .passing_percentage
                .unwrap_or(DEFAULT_PASSING_PERCENTAGE);
            Some(Quiz::new(questions, passing).map_err(learn_core::error::Error::from)?)
        };

        Course::new(id, self.title, self.description, lessons, quiz)
            .map_err(|e| CatalogError::InvalidCourse(e.into()))
    }

    /// Payload for create/update calls.
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            id: Some(course.id().as_str().to_owned()),
            title: course.title().to_owned(),
            description: course.description().map(str::to_owned),
            lessons: course
                .lessons()
                .iter()
                .map(|l| LessonDocument {
                    title: l.title().to_owned(),
                    content: l.body().map(str::to_owned),
                    video_url: l.media_url().map(str::to_owned),
                })
                .collect(),
            quiz: course
                .quiz()
                .map(|quiz| {
                    quiz.questions()
                        .iter()
                        .map(|q| QuestionDocument {
                            question: q.text().to_owned(),
                            answers: q.answers().to_vec(),
                            correct_answer: q.correct_answer_index(),
                            marks: q.marks(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            passing_percentage: course.quiz().map(Quiz::passing_percentage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "_id": "65f0c0ffee",
        "title": "Intro to Rust",
        "description": "Ownership and borrowing",
        "lessons": [
            { "title": "Ownership", "content": "Every value has an owner." },
            { "title": "Borrowing", "videoUrl": "https://cdn.example.com/borrow.mp4" }
        ],
        "quiz": [
            { "question": "Who frees memory?", "answers": ["GC", "Owner"], "correctAnswer": 1, "marks": 10 },
            { "question": "Can you have two &mut?", "answers": ["Yes", "No"], "correctAnswer": 1 }
        ],
        "passingPercentage": 75
    }"#;

    #[test]
    fn parses_backend_payload() {
        let doc: CourseDocument = serde_json::from_str(SAMPLE).unwrap();
        let course = doc.into_course().unwrap();
        assert_eq!(course.id().as_str(), "65f0c0ffee");
        assert_eq!(course.lesson_count(), 2);
        assert_eq!(
            course.lesson(1).unwrap().media_url(),
            Some("https://cdn.example.com/borrow.mp4")
        );
        let quiz = course.quiz().unwrap();
        assert_eq!(quiz.total_marks(), 11);
        assert_eq!(quiz.passing_percentage(), 75);
    }

    #[test]
    fn course_without_questions_has_no_quiz() {
        let doc: CourseDocument =
            serde_json::from_str(r#"{ "id": "c2", "title": "Reading only" }"#).unwrap();
        let course = doc.into_course().unwrap();
        assert!(!course.has_quiz());
        assert_eq!(course.lesson_count(), 0);
    }

    #[test]
    fn missing_id_is_rejected() {
        let doc: CourseDocument = serde_json::from_str(r#"{ "title": "Draft" }"#).unwrap();
        assert!(matches!(doc.into_course(), Err(CatalogError::MissingId)));
    }

    #[test]
    fn invalid_quiz_is_rejected() {
        let doc: CourseDocument = serde_json::from_str(
            r#"{ "_id": "c3", "title": "Broken", "quiz": [
                { "question": "?", "answers": ["a", "b"], "correctAnswer": 4 }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(doc.into_course(), Err(CatalogError::InvalidCourse(_))));
    }

    #[test]
    fn from_course_preserves_content() {
        let doc: CourseDocument = serde_json::from_str(SAMPLE).unwrap();
        let course = doc.clone().into_course().unwrap();
        assert_eq!(CourseDocument::from_course(&course), doc);
    }
}

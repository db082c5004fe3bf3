mod certificate;
mod course;
mod ids;
mod interaction;
mod lesson_gate;
mod progress;
mod quiz;

pub use ids::{CertificateId, CourseId, ParseIdError};

pub use certificate::{Certificate, CertificateError, can_show_certificate};
pub use course::{Course, CourseError, Lesson};
pub use interaction::{CourseInteraction, InteractionEvent, InteractionKind, MAX_INTERACTIONS};
pub use lesson_gate::LessonGate;
pub use progress::{CourseProgress, ProgressError};
pub use quiz::{
    Question, Quiz, QuizAttempt, QuizDefinitionError, QuizError, QuizOutcome, QuizPhase, QuizStep,
};

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of interaction events retained per course.
pub const MAX_INTERACTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    LessonCompleted,
    QuizStarted,
    QuizSubmitted,
    CertificateIssued,
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InteractionKind::View => "view",
            InteractionKind::LessonCompleted => "lesson_completed",
            InteractionKind::QuizStarted => "quiz_started",
            InteractionKind::QuizSubmitted => "quiz_submitted",
            InteractionKind::CertificateIssued => "certificate_issued",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub timestamp: DateTime<Utc>,
}

/// Local, per-browser analytics for one course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseInteraction {
    views: u64,
    last_viewed: Option<DateTime<Utc>>,
    interactions: VecDeque<InteractionEvent>,
}

impl CourseInteraction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn views(&self) -> u64 {
        self.views
    }

    #[must_use]
    pub fn last_viewed(&self) -> Option<DateTime<Utc>> {
        self.last_viewed
    }

    /// Most recent events, oldest first.
    #[must_use]
    pub fn interactions(&self) -> &VecDeque<InteractionEvent> {
        &self.interactions
    }

    /// Counts a view and appends the event, evicting the oldest beyond
    /// `MAX_INTERACTIONS`.
    pub fn record(&mut self, kind: InteractionKind, at: DateTime<Utc>) {
        self.views = self.views.saturating_add(1);
        self.last_viewed = Some(at);
        self.interactions.push_back(InteractionEvent {
            kind,
            timestamp: at,
        });
        self.trim();
    }

    /// Re-applies the cap to a record read back from storage.
    pub fn trim(&mut self) {
        while self.interactions.len() > MAX_INTERACTIONS {
            self.interactions.pop_front();
        }
    }
}

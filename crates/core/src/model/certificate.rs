use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::CertificateId;
use crate::model::progress::CourseProgress;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CertificateError {
    #[error("certificate is locked until the course quiz is passed")]
    NotUnlocked,

    #[error("enter the name to print on the certificate")]
    EmptyName,
}

/// The certificate step is reachable only once the quiz has been passed.
#[must_use]
pub fn can_show_certificate(progress: &CourseProgress) -> bool {
    progress.quiz_completed()
}

//
// ─── CERTIFICATE ───────────────────────────────────────────────────────────────
//

/// A completion certificate rendered on the client.
///
/// This is a cosmetic artifact: nothing here is signed, and the score comes
/// straight from local progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    id: CertificateId,
    course_title: String,
    display_name: String,
    score_percentage: u8,
    issued_at: DateTime<Utc>,
}

impl Certificate {
    /// Issues a certificate for a learner who passed the course quiz.
    ///
    /// # Errors
    ///
    /// Returns `CertificateError::NotUnlocked` if the quiz is not completed,
    /// or `CertificateError::EmptyName` if `display_name` is blank.
    pub fn issue(
        id: CertificateId,
        course_title: impl Into<String>,
        progress: &CourseProgress,
        display_name: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, CertificateError> {
        let Some(score_percentage) = progress.quiz_score() else {
            return Err(CertificateError::NotUnlocked);
        };
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(CertificateError::EmptyName);
        }

        Ok(Self {
            id,
            course_title: course_title.into(),
            display_name: display_name.to_owned(),
            score_percentage,
            issued_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CertificateId {
        self.id
    }

    #[must_use]
    pub fn course_title(&self) -> &str {
        &self.course_title
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn score_percentage(&self) -> u8 {
        self.score_percentage
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Renders the certificate as a standalone SVG document.
    #[must_use]
    pub fn render_svg(&self) -> String {
        let name = xml_escape(&self.display_name);
        let course = xml_escape(&self.course_title);
        let date = self.issued_at.format("%B %-d, %Y");

        format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="1100" height="780" viewBox="0 0 1100 780">
  <rect x="0" y="0" width="1100" height="780" fill="#fdfaf3"/>
  <rect x="30" y="30" width="1040" height="720" fill="none" stroke="#1f3a5f" stroke-width="8"/>
  <rect x="50" y="50" width="1000" height="680" fill="none" stroke="#c9a227" stroke-width="2"/>
  <text x="550" y="170" text-anchor="middle" font-family="Georgia, serif" font-size="56" fill="#1f3a5f">Certificate of Completion</text>
  <text x="550" y="250" text-anchor="middle" font-family="Georgia, serif" font-size="22" fill="#555">This certifies that</text>
  <text x="550" y="340" text-anchor="middle" font-family="Georgia, serif" font-size="48" font-style="italic" fill="#111">{name}</text>
  <line x1="250" y1="365" x2="850" y2="365" stroke="#c9a227" stroke-width="2"/>
  <text x="550" y="430" text-anchor="middle" font-family="Georgia, serif" font-size="22" fill="#555">has successfully completed the course</text>
  <text x="550" y="490" text-anchor="middle" font-family="Georgia, serif" font-size="34" font-weight="bold" fill="#1f3a5f">{course}</text>
  <text x="550" y="550" text-anchor="middle" font-family="Georgia, serif" font-size="22" fill="#555">with a final quiz score of {score}%</text>
  <text x="200" y="670" font-family="Georgia, serif" font-size="18" fill="#555">Issued {date}</text>
  <text x="900" y="670" text-anchor="end" font-family="monospace" font-size="16" fill="#888">No. {id}</text>
</svg>
"##,
            score = self.score_percentage,
            id = self.id,
        )
    }
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use uuid::Uuid;

    fn passed(score: u8) -> CourseProgress {
        let mut p = CourseProgress::new();
        p.complete_quiz(score).unwrap();
        p
    }

    fn cert_id() -> CertificateId {
        CertificateId::from_uuid(Uuid::nil())
    }

    #[test]
    fn gate_is_closed_without_quiz() {
        let mut p = CourseProgress::new();
        for i in 0..5 {
            p.mark_lesson_complete(i);
        }
        p.set_current_lesson(4);
        assert!(!can_show_certificate(&p));
        assert!(can_show_certificate(&passed(80)));
    }

    #[test]
    fn issue_requires_passed_quiz() {
        let err = Certificate::issue(cert_id(), "Rust", &CourseProgress::new(), "Ada", fixed_now())
            .unwrap_err();
        assert_eq!(err, CertificateError::NotUnlocked);
    }

    #[test]
    fn issue_requires_name() {
        let err = Certificate::issue(cert_id(), "Rust", &passed(90), "  \t", fixed_now()).unwrap_err();
        assert_eq!(err, CertificateError::EmptyName);
    }

    #[test]
    fn render_includes_details_and_escapes_markup() {
        let cert = Certificate::issue(
            cert_id(),
            "Types & Traits",
            &passed(85),
            "  <Ada> ",
            fixed_now(),
        )
        .unwrap();
        assert_eq!(cert.display_name(), "<Ada>");

        let svg = cert.render_svg();
        assert!(svg.contains("&lt;Ada&gt;"));
        assert!(svg.contains("Types &amp; Traits"));
        assert!(svg.contains("score of 85%"));
        assert!(svg.contains("November 14, 2023"));
        assert!(svg.contains("No. 000000000000"));
        assert!(!svg.contains("<Ada>"));
    }
}

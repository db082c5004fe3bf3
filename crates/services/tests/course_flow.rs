use learn_core::model::{
    Course, CourseId, InteractionKind, Lesson, Question, Quiz, QuizAttempt, QuizStep,
};
use learn_core::time::{fixed_clock, fixed_now};
use services::{AppServices, CertificateServiceError, QuizServiceError};
use storage::repository::{KeyLayout, Storage};

fn three_lesson_course() -> Course {
    let quiz = Quiz::new(
        vec![
            Question::new("What owns a value?", vec!["A GC".into(), "A binding".into()], 1, 10),
            Question::new("How many &mut at once?", vec!["One".into(), "Many".into()], 0, 10),
        ],
        75,
    )
    .unwrap();
    Course::new(
        CourseId::new("rust-101").unwrap(),
        "Rust Fundamentals",
        None,
        vec![
            Lesson::new("Ownership", None, None),
            Lesson::new("Borrowing", None, None),
            Lesson::new("Lifetimes", None, None),
        ],
        Some(quiz),
    )
    .unwrap()
}

fn answer_all(attempt: &mut QuizAttempt, answers: &[usize]) -> QuizStep {
    let mut last = None;
    for &answer in answers {
        attempt.select_answer(answer).unwrap();
        last = Some(attempt.next().unwrap());
    }
    last.expect("at least one answer")
}

#[tokio::test]
async fn learner_completes_course_and_earns_certificate() {
    let storage = Storage::sqlite(
        "sqlite:file:memdb_course_flow?mode=memory&cache=shared",
        KeyLayout::PerCourse,
    )
    .await
    .expect("connect sqlite");
    let app = AppServices::from_storage(&storage, fixed_clock(), None);
    let course = three_lesson_course();
    let id = course.id().clone();

    app.interactions().record(&id, InteractionKind::View).await;

    // Lessons 0 and 1 done, 2 outstanding.
    app.progress().complete_lesson(&course, 0).await.unwrap();
    app.progress().complete_lesson(&course, 1).await.unwrap();
    assert!(matches!(
        app.quiz().start(&course).await,
        Err(QuizServiceError::LessonsIncomplete { remaining: 1 })
    ));
    assert!(!app.certificates().can_show(&id).await);

    let completion = app.progress().complete_lesson(&course, 2).await.unwrap();
    assert!(completion.quiz_unlocked);

    // First attempt: only the first answer right -> 10 < 15.
    let mut attempt = app.quiz().start(&course).await.unwrap();
    let QuizStep::Submitted(outcome) = answer_all(&mut attempt, &[1, 1]) else {
        panic!("expected submission");
    };
    assert_eq!(outcome.score, 10);
    assert!(!outcome.passed);
    let submission = app.quiz().submit(&course, &attempt).await.unwrap();
    assert!(!submission.certificate_unlocked());
    assert!(!app.certificates().can_show(&id).await);

    // Retry from scratch and pass.
    attempt.restart();
    answer_all(&mut attempt, &[1, 0]);
    let submission = app.quiz().submit(&course, &attempt).await.unwrap();
    assert_eq!(submission.outcome.score, 20);
    assert!(submission.certificate_unlocked());
    assert!(app.certificates().can_show(&id).await);

    let err = app.certificates().issue(&course, "   ").await.unwrap_err();
    assert!(matches!(err, CertificateServiceError::Certificate(_)));

    let certificate = app.certificates().issue(&course, "Ada Lovelace").await.unwrap();
    assert_eq!(certificate.score_percentage(), 100);
    assert_eq!(certificate.issued_at(), fixed_now());

    let dir = std::env::temp_dir().join(format!("learn-cert-{}", certificate.id().value()));
    let path = dir.join("nested").join("certificate.svg");
    let written = app.certificates().export_svg(&certificate, &path).await.unwrap();
    let svg = tokio::fs::read_to_string(&written).await.unwrap();
    assert!(svg.contains("Ada Lovelace"));
    assert!(svg.contains("Rust Fundamentals"));
    tokio::fs::remove_dir_all(&dir).await.unwrap();

    // Progress survives a fresh service stack over the same database.
    let reopened = AppServices::from_storage(&storage, fixed_clock(), None);
    let progress = reopened.progress().load_for(&course).await;
    assert_eq!(progress.completed_lessons().len(), 3);
    assert_eq!(progress.quiz_score(), Some(100));
    assert_eq!(progress.last_accessed(), Some(fixed_now()));

    let log = reopened.interactions().get(&id).await;
    let kinds: Vec<_> = log.interactions().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InteractionKind::View,
            InteractionKind::QuizStarted,
            InteractionKind::QuizSubmitted,
            InteractionKind::QuizSubmitted,
            InteractionKind::CertificateIssued,
        ]
    );
}

#[tokio::test]
async fn course_without_quiz_never_unlocks_certificate() {
    let storage = Storage::in_memory(KeyLayout::SharedBlob);
    let app = AppServices::from_storage(&storage, fixed_clock(), None);
    let course = Course::new(
        CourseId::new("reading").unwrap(),
        "Reading list",
        None,
        vec![Lesson::new("Chapter 1", None, None)],
        None,
    )
    .unwrap();

    app.progress().complete_lesson(&course, 0).await.unwrap();
    assert!(matches!(
        app.quiz().start(&course).await,
        Err(QuizServiceError::NoQuiz(_))
    ));
    assert!(!app.certificates().can_show(course.id()).await);
    assert!(app.certificates().issue(&course, "Ada").await.is_err());
}

#[tokio::test]
async fn unsubmitted_attempt_is_rejected() {
    let storage = Storage::in_memory(KeyLayout::PerCourse);
    let app = AppServices::from_storage(&storage, fixed_clock(), None);
    let course = three_lesson_course();
    for i in 0..3 {
        app.progress().complete_lesson(&course, i).await.unwrap();
    }

    let attempt = app.quiz().start(&course).await.unwrap();
    assert!(matches!(
        app.quiz().submit(&course, &attempt).await,
        Err(QuizServiceError::NotSubmitted)
    ));
}

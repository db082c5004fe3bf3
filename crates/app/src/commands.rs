use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use learn_core::model::{
    Course, CourseId, CourseInteraction, CourseProgress, InteractionKind, LessonGate, QuizStep,
};
use services::AppServices;
use services::certificate_service::default_file_name;

use crate::Command;
use crate::source::CourseSource;

pub async fn run(app: &AppServices, source: &CourseSource, command: Command) -> Result<()> {
    match command {
        Command::Courses => list_courses(app, source).await,
        Command::Status { course } => {
            let course = source.course(&course).await?;
            app.interactions()
                .record(course.id(), InteractionKind::View)
                .await;
            let progress = app.progress().load_for(&course).await;
            print_status(&course, &progress);
            Ok(())
        }
        Command::Complete { course, lesson } => {
            let course = source.course(&course).await?;
            let index = lesson_index(lesson)?;
            let done = app.progress().complete_lesson(&course, index).await?;
            if done.newly_completed {
                println!("Completed lesson {lesson}.");
            } else {
                println!("Lesson {lesson} was already complete.");
            }
            if done.quiz_unlocked {
                println!("All lessons done: the quiz is unlocked.");
            }
            print_status(&course, &done.progress);
            Ok(())
        }
        Command::Goto { course, lesson } => {
            let course = source.course(&course).await?;
            let progress = app
                .progress()
                .navigate_to(&course, lesson_index(lesson)?)
                .await?;
            print_status(&course, &progress);
            Ok(())
        }
        Command::Quiz { course, answers } => {
            let course = source.course(&course).await?;
            take_quiz(app, &course, &answers).await
        }
        Command::Certificate { course, name, out } => {
            let course = source.course(&course).await?;
            let certificate = app.certificates().issue(&course, &name).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(default_file_name(course.id())));
            let written = app.certificates().export_svg(&certificate, &out).await?;
            println!(
                "Certificate {} for {} ({}%) written to {}",
                certificate.id(),
                certificate.display_name(),
                certificate.score_percentage(),
                written.display()
            );
            Ok(())
        }
        Command::Interactions { course: Some(raw) } => {
            let id: CourseId = raw.parse().context("invalid course id")?;
            print_interactions(&id, &app.interactions().get(&id).await);
            Ok(())
        }
        Command::Interactions { course: None } => {
            let all = app.interactions().get_all().await;
            if all.is_empty() {
                println!("No interactions recorded.");
            }
            for (id, log) in &all {
                print_interactions(id, log);
            }
            Ok(())
        }
        Command::Time { course, seconds } => {
            let id: CourseId = course.parse().context("invalid course id")?;
            let progress = app.progress().add_time_spent(&id, seconds).await;
            println!("Total time on {id}: {}s", progress.total_time_spent());
            Ok(())
        }
        Command::Reset { course } => {
            let id: CourseId = course.parse().context("invalid course id")?;
            app.progress().reset(&id).await?;
            println!("Progress for {id} cleared.");
            Ok(())
        }
    }
}

async fn list_courses(app: &AppServices, source: &CourseSource) -> Result<()> {
    let courses = source.courses().await?;
    if courses.is_empty() {
        println!("No courses available.");
    }
    for course in &courses {
        let progress = app.progress().load_for(course).await;
        let gate = gate(&progress, course);
        println!(
            "{:<24} {:>3}%  {} ({} lessons{})",
            course.id(),
            gate.progress_percentage(),
            course.title(),
            course.lesson_count(),
            if course.has_quiz() { " + quiz" } else { "" }
        );
    }
    Ok(())
}

async fn take_quiz(app: &AppServices, course: &Course, answers: &[usize]) -> Result<()> {
    let mut attempt = app.quiz().start(course).await?;
    let expected = attempt.quiz().question_count();
    if answers.len() != expected {
        bail!("expected {expected} answers, got {}", answers.len());
    }

    for &answer in answers {
        let index = answer
            .checked_sub(1)
            .context("answers are numbered from 1")?;
        if let Some(question) = attempt.current_question() {
            let chosen = question.answers().get(index).map_or("?", String::as_str);
            let marker = if attempt.is_last_question() { " (last)" } else { "" };
            let number = attempt.current_index().map_or(0, |i| i + 1);
            println!("Q{number}{marker}: {} -> {chosen}", question.text());
        }
        attempt.select_answer(index)?;
        if let QuizStep::Submitted(_) = attempt.next()? {
            break;
        }
    }

    let submission = app.quiz().submit(course, &attempt).await?;
    let outcome = submission.outcome;
    println!(
        "Score {}/{} ({}%), {} of {} correct, pass mark {}.",
        outcome.score,
        outcome.total_marks,
        outcome.percentage(),
        outcome.correct_count,
        expected,
        outcome.passing_mark
    );
    if submission.certificate_unlocked() {
        println!("Passed. Issue your certificate with `learn certificate {}`.", course.id());
    } else {
        println!("Not passed yet. Review the lessons and try again.");
    }
    Ok(())
}

fn print_status(course: &Course, progress: &CourseProgress) {
    let gate = gate(progress, course);
    println!("{} [{}]", course.title(), course.id());
    println!("  progress: {}%", gate.progress_percentage());
    for (i, lesson) in course.lessons().iter().enumerate() {
        let mark = if progress.is_lesson_completed(i) {
            "x"
        } else if gate.can_advance_to(i) {
            " "
        } else {
            "-"
        };
        let here = if i == progress.current_lesson_index() { " <" } else { "" };
        println!("  [{mark}] {}. {}{here}", i + 1, lesson.title());
    }
    if course.has_quiz() {
        let quiz = match progress.quiz_score() {
            Some(score) => format!("passed with {score}%"),
            None if gate.quiz_unlocked() => "unlocked".to_string(),
            None => "locked".to_string(),
        };
        println!("  quiz: {quiz}");
    }
    println!("  time spent: {}s", progress.total_time_spent());
    if let Some(at) = progress.last_accessed() {
        println!("  last accessed: {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
}

fn print_interactions(id: &CourseId, log: &CourseInteraction) {
    println!("{id}: {} views", log.views());
    for event in log.interactions() {
        println!("  {} {}", event.timestamp.format("%Y-%m-%d %H:%M:%S"), event.kind);
    }
}

fn gate<'a>(progress: &'a CourseProgress, course: &Course) -> LessonGate<'a> {
    LessonGate::new(progress, course.lesson_count(), course.has_quiz())
}

fn lesson_index(lesson: usize) -> Result<usize> {
    lesson.checked_sub(1).context("lessons are numbered from 1")
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use services::{AppServices, CatalogConfig, Clock};
use storage::KeyLayout;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod source;

use source::CourseSource;

/// Course progress, quizzes and certificates from the terminal.
#[derive(Parser, Debug)]
#[command(name = "learn")]
#[command(version)]
struct Args {
    /// SQLite database holding progress and interactions
    #[arg(long = "db", default_value = "sqlite://learn.sqlite3", env = "LEARN_DB_URL")]
    db_url: String,

    /// JSON file with an array of course documents
    #[arg(long, env = "LEARN_CATALOG")]
    catalog: Option<PathBuf>,

    /// Backend base URL, used when no catalog file is given
    #[arg(long, env = "LEARN_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "LEARN_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Storage layout for progress documents
    #[arg(long, value_enum, default_value_t = Layout::PerCourse, env = "LEARN_KEY_LAYOUT")]
    key_layout: Layout,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Layout {
    PerCourse,
    SharedBlob,
}

impl From<Layout> for KeyLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::PerCourse => KeyLayout::PerCourse,
            Layout::SharedBlob => KeyLayout::SharedBlob,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List courses with overall progress
    Courses,
    /// Show progress for one course and record a view
    Status { course: String },
    /// Mark a lesson complete (lessons are numbered from 1)
    Complete { course: String, lesson: usize },
    /// Move to a lesson without completing it
    Goto { course: String, lesson: usize },
    /// Take the course quiz with one answer number per question
    Quiz {
        course: String,
        #[arg(long, value_delimiter = ',', required = true)]
        answers: Vec<usize>,
    },
    /// Issue the completion certificate and write it as SVG
    Certificate {
        course: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show recent interactions for one course, or for all of them
    Interactions { course: Option<String> },
    /// Add study time, in seconds
    Time { course: String, seconds: u64 },
    /// Forget all progress for a course
    Reset { course: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "learn=info,services=info,storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let db_url = normalize_sqlite_url(&args.db_url);
    prepare_sqlite_file(&db_url)?;
    info!(db = %db_url, layout = ?args.key_layout, "opening progress store");

    let catalog_config = match args.api_url.as_deref() {
        Some(url) => Some(
            CatalogConfig::new(url, args.api_token.clone()).context("invalid --api-url")?,
        ),
        None => None,
    };
    let app = AppServices::new_sqlite(
        &db_url,
        args.key_layout.into(),
        Clock::default(),
        catalog_config,
    )
    .await
    .context("failed to open progress store")?;

    let source = CourseSource::resolve(args.catalog.as_deref(), app.catalog()).await?;
    commands::run(&app, &source, args.command).await
}

/// Turns relative paths into absolute `sqlite://` URLs; in-memory and
/// already-absolute URLs pass through.
fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("sqlite://") {
        if Path::new(rest.split('?').next().unwrap_or(rest)).is_absolute() {
            return trimmed.to_string();
        }
    }

    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file and its parent directory so the pool can open it.
fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
    }
    Ok(())
}

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mcq_core::model::{IdError, TestId, TopicId};
use services::{
    CatalogService, Clock, ExplanationClient, FileQuestionSource, HttpExplanationClient,
    StudyError, StudyService,
};
use storage::repository::Storage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod interactive;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId(IdError),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId(err) => write!(f, "{err}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<IdError> for ArgsError {
    fn from(err: IdError) -> Self {
        Self::InvalidId(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  mcq-study topics         [options]");
    eprintln!("  mcq-study study          --topic <id> --test <id> [options]");
    eprintln!("  mcq-study review         [options]");
    eprintln!("  mcq-study clear-mistakes [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --data <dir>           question data root (default .)");
    eprintln!("  --catalog <path>       catalog relative to the data root (default data/topics.json)");
    eprintln!("  --db <sqlite_url>      progress database (default sqlite://mcq.sqlite3)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MCQ_DATA_DIR, MCQ_CATALOG, MCQ_DB_URL, MCQ_EXPLAIN_URL, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Topics,
    Study { topic: TopicId, test: TestId },
    Review,
    ClearMistakes,
}

struct Args {
    data_dir: PathBuf,
    catalog: String,
    db_url: String,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut data_dir = std::env::var("MCQ_DATA_DIR").map_or_else(|_| PathBuf::from("."), PathBuf::from);
        let mut catalog =
            std::env::var("MCQ_CATALOG").unwrap_or_else(|_| "data/topics.json".into());
        let mut db_url = std::env::var("MCQ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://mcq.sqlite3".into(), normalize_sqlite_url);

        let mut args = argv.into_iter().peekable();
        let name = match args.peek() {
            Some(first) if !first.starts_with("--") => args.next(),
            _ => None,
        };

        let mut topic = None;
        let mut test = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data" => data_dir = PathBuf::from(require_value(&mut args, "--data")?),
                "--catalog" => catalog = require_value(&mut args, "--catalog")?,
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--topic" => topic = Some(TopicId::new(require_value(&mut args, "--topic")?)?),
                "--test" => test = Some(TestId::new(require_value(&mut args, "--test")?)?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_deref() {
            None | Some("topics") => Command::Topics,
            Some("study") => Command::Study {
                topic: topic.ok_or(ArgsError::MissingFlag { flag: "--topic" })?,
                test: test.ok_or(ArgsError::MissingFlag { flag: "--test" })?,
            },
            Some("review") => Command::Review,
            Some("clear-mistakes") => Command::ClearMistakes,
            Some(other) => return Err(ArgsError::UnknownArg(other.to_string())),
        };

        Ok(Self {
            data_dir,
            catalog,
            db_url,
            command,
        })
    }
}

const MEMORY_DB: &str = "sqlite::memory:";

/// Turn `sqlite:relative/path` into an absolute `sqlite://` URL so the
/// progress database does not move with the working directory.
fn normalize_sqlite_url(raw: String) -> String {
    let raw = raw.trim();
    if raw == MEMORY_DB || raw.starts_with("sqlite://") {
        return raw.to_owned();
    }
    let path = Path::new(raw.strip_prefix("sqlite:").unwrap_or(raw));
    if path.is_absolute() {
        return format!("sqlite://{}", path.display());
    }
    let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    format!("sqlite://{}", base.join(path).display())
}

/// File behind a normalized URL; `None` for the in-memory database.
fn progress_db_path(db_url: &str) -> Result<Option<&Path>, ArgsError> {
    if db_url == MEMORY_DB {
        return Ok(None);
    }
    let invalid = || ArgsError::InvalidDbUrl {
        raw: db_url.to_string(),
    };
    let rest = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let file = rest.split_once('?').map_or(rest, |(file, _)| file);
    if file.is_empty() {
        return Err(invalid());
    }
    Ok(Some(Path::new(file)))
}

/// sqlx will not create the file or its directory; do it up front.
fn ensure_progress_db(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = progress_db_path(db_url)? else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcq_study=info,services=info,storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn print_topics(catalog: &CatalogService) -> Result<(), StudyError> {
    for entry in catalog.overview().await? {
        let topic = &entry.topic;
        let status = if topic.status.is_active() {
            format!("{}%", entry.percent)
        } else {
            "coming soon".to_string()
        };
        println!("{} {} [{}] {status}", topic.icon, topic.name, topic.id);
        if !topic.description.is_empty() {
            println!("    {}", topic.description);
        }
        for test in &entry.tests {
            let practice = &test.test;
            let status = if practice.status.is_active() {
                format!("{} questions, {}% viewed", practice.question_count, test.percent)
            } else {
                "coming soon".to_string()
            };
            println!("    - {} [{}] {status}", practice.name, practice.id);
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), Some("--help" | "-h" | "help")) {
        print_usage();
        return Ok(());
    }
    let parsed = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    ensure_progress_db(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let source = Arc::new(FileQuestionSource::new(&parsed.data_dir, &parsed.catalog));
    let study = StudyService::new(Clock::system(), &storage, source);
    let explainer: Arc<dyn ExplanationClient> = Arc::new(HttpExplanationClient::from_env());

    match parsed.command {
        Command::Topics => {
            let catalog = CatalogService::new(study.source(), storage.progress.clone());
            print_topics(&catalog).await?;
        }
        Command::Study { topic, test } => match study.open_practice_test(&topic, &test).await {
            Ok(state) => interactive::run_session(&study, explainer, state).await?,
            Err(StudyError::Resource(err)) => eprintln!("Questions unavailable: {err}"),
            Err(StudyError::Session(err)) => eprintln!("{err}"),
            Err(err) => return Err(err.into()),
        },
        Command::Review => match study.open_review().await? {
            Some(state) => interactive::run_session(&study, explainer, state).await?,
            None => println!("Nothing to review. Missed questions show up here."),
        },
        Command::ClearMistakes => {
            let count = study.wrong_answer_count().await?;
            study.clear_wrong_answers().await?;
            println!("Cleared {count} missed question(s).");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

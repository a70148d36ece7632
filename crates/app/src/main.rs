use std::fmt;
use std::path::PathBuf;

use log::info;
use services::{AppServices, Clock, LessonProgressView, ProgressManager};
use tutor_core::LessonCatalog;
use tutor_core::grading::grade_answer;

const DEFAULT_DB_URL: &str = "sqlite://tutor.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tutor stats                                    [--db <sqlite_url>] [--catalog <file>]");
    eprintln!("  tutor roadmap");
    eprintln!("  tutor lesson <lesson_id>");
    eprintln!("  tutor answer <lesson_id> <exercise_id> <answer>");
    eprintln!("  tutor complete <lesson_id>");
    eprintln!("  tutor export [--out <file>]");
    eprintln!("  tutor import <file>");
    eprintln!("  tutor reconcile");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --catalog <bundled TypeScript course>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTOR_DB_URL, TUTOR_CATALOG, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Stats,
    Roadmap,
    Lesson {
        lesson_id: String,
    },
    Answer {
        lesson_id: String,
        exercise_id: String,
        answer: String,
    },
    Complete {
        lesson_id: String,
    },
    Export {
        out: Option<PathBuf>,
    },
    Import {
        file: PathBuf,
    },
    Reconcile,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    catalog: Option<PathBuf>,
    command: Command,
}

impl Args {
    /// Parse everything after the program name. `env` supplies defaults
    /// that flags override.
    fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("TUTOR_DB_URL")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut catalog = env("TUTOR_CATALOG")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let mut out = None;
        let mut help = false;
        let mut positional = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => {
                    catalog = Some(PathBuf::from(require_value(&mut args, "--catalog")?));
                }
                "--out" => {
                    out = Some(PathBuf::from(require_value(&mut args, "--out")?));
                }
                "--help" | "-h" => help = true,
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let command = if help {
            Command::Help
        } else {
            Command::from_positional(positional, out)?
        };
        Ok(Self {
            db_url,
            catalog,
            command,
        })
    }
}

impl Command {
    fn from_positional(
        positional: Vec<String>,
        out: Option<PathBuf>,
    ) -> Result<Self, ArgsError> {
        let mut rest = positional.into_iter();
        let Some(name) = rest.next() else {
            return Ok(Self::Help);
        };
        let mut take = |command: &'static str, name: &'static str| {
            rest.next()
                .ok_or(ArgsError::MissingArgument { command, name })
        };

        let command = match name.as_str() {
            "stats" => Self::Stats,
            "roadmap" => Self::Roadmap,
            "lesson" => Self::Lesson {
                lesson_id: take("lesson", "lesson_id")?,
            },
            "answer" => Self::Answer {
                lesson_id: take("answer", "lesson_id")?,
                exercise_id: take("answer", "exercise_id")?,
                answer: take("answer", "answer")?,
            },
            "complete" => Self::Complete {
                lesson_id: take("complete", "lesson_id")?,
            },
            "export" => Self::Export { out: None },
            "import" => Self::Import {
                file: PathBuf::from(take("import", "file")?),
            },
            "reconcile" => Self::Reconcile,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        if let Some(extra) = rest.next() {
            return Err(ArgsError::UnknownArg(extra));
        }
        match (command, out) {
            (Self::Export { .. }, out) => Ok(Self::Export { out }),
            (_, Some(_)) => Err(ArgsError::UnknownArg("--out".into())),
            (command, None) => Ok(command),
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the directory that will hold the database file; the store
/// creates the file itself.
fn ensure_db_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn load_catalog(path: Option<&PathBuf>) -> Result<LessonCatalog, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(LessonCatalog::builtin()?);
    };
    let json = std::fs::read_to_string(path)?;
    let catalog = LessonCatalog::from_json(&json)?;
    info!("loaded {} lessons from {}", catalog.len(), path.display());
    Ok(catalog)
}

async fn print_stats(progress: &ProgressManager) -> Result<(), Box<dyn std::error::Error>> {
    let summary = progress.dashboard().await?;
    println!(
        "Lessons completed: {}/{}",
        summary.completed_lessons, summary.total_lessons
    );
    println!("Time spent:        {}", summary.formatted_time());
    println!(
        "Learning since:    {}",
        summary.start_date.format("%Y-%m-%d")
    );
    if let Some(current) = &summary.current_lesson {
        println!("Current lesson:    {current}");
    }
    Ok(())
}

async fn print_roadmap(progress: &ProgressManager) -> Result<(), Box<dyn std::error::Error>> {
    for section in progress.roadmap().await? {
        println!(
            "{} ({}/{}, {:.0}%)",
            section.label,
            section.completed,
            section.total,
            section.percent()
        );
        for lesson in &section.lessons {
            let mark = if lesson.is_completed {
                "[x]"
            } else if lesson.is_unlocked {
                "[ ]"
            } else {
                "[-]"
            };
            println!(
                "  {mark} {:<28} {} ({} min)",
                lesson.id.as_str(),
                lesson.title,
                lesson.estimated_minutes
            );
        }
    }
    Ok(())
}

/// Open a view on a catalog lesson; unknown ids are rejected before any
/// visit is recorded.
async fn open_known_lesson(
    progress: &ProgressManager,
    lesson_id: &str,
) -> Result<LessonProgressView, Box<dyn std::error::Error>> {
    if progress.catalog().find_lesson_by_id(lesson_id).is_none() {
        return Err(format!("unknown lesson: {lesson_id}").into());
    }
    Ok(LessonProgressView::open(progress.clone(), lesson_id).await?)
}

async fn show_lesson(
    progress: &ProgressManager,
    lesson_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let view = open_known_lesson(progress, lesson_id).await?;
    let Some(lesson) = view.lesson() else {
        return Ok(());
    };

    if !progress.is_lesson_unlocked(lesson_id).await? {
        println!("(locked: finish its prerequisites first)");
    }
    println!("{} [{}]", lesson.title(), lesson.difficulty().as_str());
    println!();
    println!("{}", lesson.content().trim());
    println!();
    for exercise in lesson.exercises() {
        let mark = if view.is_exercise_completed(exercise.id().as_str()) {
            "[x]"
        } else {
            "[ ]"
        };
        println!("{mark} {}: {}", exercise.id(), exercise.question());
        for option in exercise.options().unwrap_or_default() {
            println!("      - {option}");
        }
    }
    let snapshot = view.snapshot();
    println!();
    println!(
        "Progress: {}/{} exercises ({}%){}",
        snapshot.completed_count,
        snapshot.total_exercises,
        snapshot.quiz_score,
        if snapshot.is_completed { ", completed" } else { "" }
    );
    view.finish().await?;
    Ok(())
}

async fn answer_exercise(
    progress: &ProgressManager,
    lesson_id: &str,
    exercise_id: &str,
    answer: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = open_known_lesson(progress, lesson_id).await?;
    let Some(exercise) = view
        .lesson()
        .and_then(|lesson| lesson.exercise(exercise_id))
        .cloned()
    else {
        view.finish().await?;
        return Err(format!("unknown exercise {exercise_id} in lesson {lesson_id}").into());
    };

    if grade_answer(&exercise, answer) {
        view.mark_exercise_completed(exercise_id).await?;
        println!("Correct. {}", exercise.explanation());
        if view.all_exercises_completed() && !view.is_completed() {
            println!("Every exercise is done; run `tutor complete {lesson_id}`.");
        }
    } else {
        println!("Not quite. {}", exercise.explanation());
    }
    view.finish().await?;
    Ok(())
}

async fn complete_lesson(
    progress: &ProgressManager,
    lesson_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = open_known_lesson(progress, lesson_id).await?;
    let snapshot = view.snapshot();
    if view.complete_lesson().await? {
        println!("Lesson {lesson_id} completed.");
    } else if snapshot.is_completed {
        println!("Lesson {lesson_id} was already completed.");
    } else {
        println!(
            "Lesson {lesson_id} has {}/{} exercises done; finish them first.",
            snapshot.completed_count, snapshot.total_exercises
        );
    }
    view.finish().await?;
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok()).map_err(
        |e| {
            eprintln!("{e}");
            print_usage();
            e
        },
    )?;

    if parsed.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let catalog = load_catalog(parsed.catalog.as_ref())?;

    ensure_db_dir(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock(), catalog).await?;
    info!("progress store at {}", parsed.db_url);
    let progress = services.progress();

    match parsed.command {
        Command::Stats => print_stats(&progress).await,
        Command::Roadmap => print_roadmap(&progress).await,
        Command::Lesson { lesson_id } => show_lesson(&progress, &lesson_id).await,
        Command::Answer {
            lesson_id,
            exercise_id,
            answer,
        } => answer_exercise(&progress, &lesson_id, &exercise_id, &answer).await,
        Command::Complete { lesson_id } => complete_lesson(&progress, &lesson_id).await,
        Command::Export { out } => {
            let exported = progress.export_progress().await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, exported)?;
                    println!("Progress written to {}", path.display());
                }
                None => println!("{exported}"),
            }
            Ok(())
        }
        Command::Import { file } => {
            let serialized = std::fs::read_to_string(&file)?;
            if progress.import_progress(&serialized).await? {
                println!("Progress imported from {}", file.display());
                Ok(())
            } else {
                Err(format!("{} is not a valid progress export", file.display()).into())
            }
        }
        Command::Reconcile => {
            let repaired = progress.reconcile_all().await?;
            println!("Repaired {repaired} lesson record(s).");
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

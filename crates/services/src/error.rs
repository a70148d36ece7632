//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tutor_core::CatalogError;

/// Errors emitted by `ProgressManager` and `LessonProgressView`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    /// A stored record exists but does not parse as the expected shape.
    #[error("stored progress under {key} is corrupt: {source}")]
    CorruptData {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("quiz score must be a finite number, got {0}")]
    InvalidScore(f64),
    #[error("progress could not be serialized: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Reasons an import payload is rejected.
///
/// Never escapes `import_progress`, which reports it as `false`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("invalid progress data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid progress data: completedLessons must be an array")]
    CompletedLessonsNotArray,
    #[error("invalid progress data: quizScores must be an object")]
    QuizScoresNotObject,
    #[error("invalid progress data: startDate must be a string")]
    StartDateNotString,
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

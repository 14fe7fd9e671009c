//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use mcq_core::model::{CatalogError, PermutationError, QuestionId, TestId, TopicId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Failures loading the catalog or a question set.
///
/// Callers surface these as an empty, unavailable state rather than aborting.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),
    #[error("topic {topic} has no practice test {test}")]
    UnknownTest { topic: TopicId, test: TestId },
    #[error("practice test {topic}/{test} is not available yet")]
    Unavailable { topic: TopicId, test: TestId },
}

/// Errors emitted by session commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no bookmarked questions yet; bookmark some questions first")]
    NoBookmarks,
    #[error("question index {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no question is currently displayed")]
    NoCurrentQuestion,
    #[error("question {id}: option {index} is out of range for {len} options")]
    InvalidOption {
        id: QuestionId,
        index: usize,
        len: usize,
    },
    #[error("no questions available for session")]
    Empty,
}

/// Errors emitted by the explanation client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExplanationError {
    #[error("explanations are not configured")]
    Disabled,
    #[error("explanation service returned an empty response")]
    EmptyResponse,
    #[error("explanation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("explanation service error: {0}")]
    Service(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `StudyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Permutation(#[from] PermutationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

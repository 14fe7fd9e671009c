#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod explanation;
pub mod sessions;
pub mod shuffle;

pub use mcq_core::Clock;
pub use sessions as session;

pub use catalog::{
    CatalogService, FileQuestionSource, InMemoryQuestionSource, QuestionSource, ReviewItem,
    TopicOverview, build_review_set,
};
pub use error::{ExplanationError, ResourceError, SessionError, StudyError};
pub use explanation::{ExplanationClient, ExplanationRequest, HttpExplanationClient};
pub use sessions::{SessionState, StudyService};
pub use shuffle::ShuffleEngine;

mod attempts;
pub mod catalog;
mod ids;
pub mod ledger;
mod progress;
mod question;
mod session_question;

pub use attempts::AttemptLedger;
pub use catalog::{Availability, Catalog, CatalogError, PracticeTest, QuestionSetDocument, Topic};
pub use ids::{IdError, KEY_SEPARATOR, QuestionId, TestId, TopicId};
pub use ledger::{QuestionOrigin, WrongAnswerEntry, WrongAnswerLedger};
pub use progress::{ProgressRecord, completion_percent};
pub use question::{
    MAX_OPTIONS, MIN_OPTIONS, Question, QuestionDraft, QuestionError, validate_question_set,
};
pub use session_question::{
    LockedShuffle, PermutationError, SessionOption, SessionQuestion, option_label,
    strip_option_label,
};

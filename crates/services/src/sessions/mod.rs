mod progress;
mod state;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::{Completion, SessionProgress};
pub use state::{
    BookmarkToggle, Direction, ExplanationTicket, FilterMode, Selection, SelectionOutcome,
    SessionEffect, SessionScope, SessionState,
};
pub use view::{ListEntry, NavigatorCell};
pub use workflow::StudyService;

/// Aggregated view of session progress over the filtered questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub viewed: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// Completion check result.
///
/// `correct_first_attempt` counts filtered questions answered right on the
/// first click; it is meaningful once `complete` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub complete: bool,
    pub correct_first_attempt: usize,
    pub total: usize,
}

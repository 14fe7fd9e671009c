use mcq_core::model::QuestionId;

/// One row of the flat question list.
///
/// `correct_index` is only populated for revealed questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub position: usize,
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub bookmarked: bool,
    pub revealed: bool,
    pub correct_index: Option<usize>,
}

/// One cell of the question navigator strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorCell {
    pub position: usize,
    pub id: QuestionId,
    pub current: bool,
    pub viewed: bool,
    pub bookmarked: bool,
    pub revealed: bool,
}

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use mcq_core::model::{
    AttemptLedger, LockedShuffle, ProgressRecord, QuestionId, QuestionOrigin, SessionQuestion,
    TestId, TopicId,
};

use super::progress::{Completion, SessionProgress};
use super::view::{ListEntry, NavigatorCell};
use crate::error::SessionError;

//
// ─── COMMAND TYPES ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    All,
    BookmarkedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Where a session's questions come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionScope {
    /// A single practice test; progress and shuffle are persisted.
    Practice {
        topic: TopicId,
        test: TestId,
        locked_at: DateTime<Utc>,
    },
    /// Questions gathered from the wrong-answer ledger; nothing is persisted
    /// except ledger updates.
    Review {
        origins: HashMap<QuestionId, QuestionOrigin>,
    },
}

/// Persistence work a command asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Overwrite the progress record from `SessionState::progress_record`.
    SaveProgress,
    /// Overwrite the locked shuffle from `SessionState::locked_shuffle`.
    SaveShuffle,
    RecordMiss(QuestionOrigin),
    ClearMiss(QuestionOrigin),
    /// Delete the stored progress record and locked shuffle.
    DeletePersisted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Correct {
        first_attempt: bool,
        completion: Completion,
    },
    /// The answer stays hidden; only feedback for the clicked option is shown.
    Incorrect {
        feedback: Option<String>,
        remaining: usize,
    },
    AlreadyRevealed,
    AlreadyAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub outcome: SelectionOutcome,
    pub effects: Vec<SessionEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkToggle {
    pub bookmarked: bool,
    pub effects: Vec<SessionEffect>,
}

/// Identifies the question view an explanation request was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplanationTicket {
    question_id: QuestionId,
    generation: u64,
}

impl ExplanationTicket {
    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// In-memory study session over a fixed, already shuffled question sequence.
///
/// All commands are synchronous and touch no storage. Commands that change
/// durable state return [`SessionEffect`]s for the caller to apply.
#[derive(Debug, Clone)]
pub struct SessionState {
    scope: SessionScope,
    questions: Vec<SessionQuestion>,
    filter: FilterMode,
    current_index: usize,
    viewed: BTreeSet<QuestionId>,
    bookmarked: BTreeSet<QuestionId>,
    revealed: BTreeSet<QuestionId>,
    attempts: AttemptLedger,
    generation: u64,
}

impl SessionState {
    /// Resume or start a practice session from a locked shuffle.
    ///
    /// Progress ids that are not part of the shuffle are dropped.
    #[must_use]
    pub fn practice(
        topic: TopicId,
        test: TestId,
        shuffle: LockedShuffle,
        progress: Option<ProgressRecord>,
    ) -> Self {
        let LockedShuffle {
            questions,
            attempts,
            locked_at,
        } = shuffle;
        let known: BTreeSet<QuestionId> = questions.iter().map(SessionQuestion::id).collect();
        let keep = |ids: BTreeSet<QuestionId>| -> BTreeSet<QuestionId> {
            ids.intersection(&known).copied().collect()
        };
        let (viewed, bookmarked, revealed) = match progress {
            Some(p) => (keep(p.viewed), keep(p.bookmarked), keep(p.revealed)),
            None => Default::default(),
        };

        Self {
            scope: SessionScope::Practice {
                topic,
                test,
                locked_at,
            },
            questions,
            filter: FilterMode::All,
            current_index: 0,
            viewed,
            bookmarked,
            revealed,
            attempts,
            generation: 0,
        }
    }

    /// Start a review session; `origins` maps each question to its ledger entry.
    #[must_use]
    pub fn review(
        questions: Vec<SessionQuestion>,
        origins: HashMap<QuestionId, QuestionOrigin>,
    ) -> Self {
        Self {
            scope: SessionScope::Review { origins },
            questions,
            filter: FilterMode::All,
            current_index: 0,
            viewed: BTreeSet::new(),
            bookmarked: BTreeSet::new(),
            revealed: BTreeSet::new(),
            attempts: AttemptLedger::default(),
            generation: 0,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    #[must_use]
    pub fn is_review(&self) -> bool {
        matches!(self.scope, SessionScope::Review { .. })
    }

    #[must_use]
    pub fn questions(&self) -> &[SessionQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn filter_mode(&self) -> FilterMode {
        self.filter
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn viewed(&self) -> &BTreeSet<QuestionId> {
        &self.viewed
    }

    #[must_use]
    pub fn bookmarked(&self) -> &BTreeSet<QuestionId> {
        &self.bookmarked
    }

    #[must_use]
    pub fn revealed(&self) -> &BTreeSet<QuestionId> {
        &self.revealed
    }

    #[must_use]
    pub fn attempts(&self) -> &AttemptLedger {
        &self.attempts
    }

    #[must_use]
    pub fn is_revealed(&self, id: QuestionId) -> bool {
        self.revealed.contains(&id)
    }

    // ─── queries ───

    /// Questions visible under the current filter, in session order.
    #[must_use]
    pub fn filtered_questions(&self) -> Vec<&SessionQuestion> {
        match self.filter {
            FilterMode::All => self.questions.iter().collect(),
            FilterMode::BookmarkedOnly => self
                .questions
                .iter()
                .filter(|q| self.bookmarked.contains(&q.id()))
                .collect(),
        }
    }

    fn filtered_len(&self) -> usize {
        match self.filter {
            FilterMode::All => self.questions.len(),
            FilterMode::BookmarkedOnly => self
                .questions
                .iter()
                .filter(|q| self.bookmarked.contains(&q.id()))
                .count(),
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&SessionQuestion> {
        self.filtered_questions().get(self.current_index).copied()
    }

    #[must_use]
    pub fn can_go_previous(&self) -> bool {
        self.current_index > 0
    }

    #[must_use]
    pub fn can_go_next(&self) -> bool {
        self.current_index + 1 < self.filtered_len()
    }

    /// True iff every filtered question is revealed.
    #[must_use]
    pub fn check_completion(&self) -> Completion {
        let filtered = self.filtered_questions();
        let complete = filtered.iter().all(|q| self.revealed.contains(&q.id()));
        let correct_first_attempt = filtered
            .iter()
            .filter(|q| self.attempts.first_attempt_correct(q.id()) == Some(true))
            .count();
        Completion {
            complete,
            correct_first_attempt,
            total: filtered.len(),
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let filtered = self.filtered_questions();
        let viewed = filtered
            .iter()
            .filter(|q| self.viewed.contains(&q.id()))
            .count();
        let answered = filtered
            .iter()
            .filter(|q| self.revealed.contains(&q.id()))
            .count();
        SessionProgress {
            total: filtered.len(),
            viewed,
            answered,
            remaining: filtered.len() - answered,
            is_complete: answered == filtered.len(),
        }
    }

    /// Flat list of the filtered questions; the correct option is exposed
    /// only for revealed questions.
    #[must_use]
    pub fn list_view(&self) -> Vec<ListEntry> {
        self.filtered_questions()
            .into_iter()
            .enumerate()
            .map(|(position, q)| {
                let revealed = self.revealed.contains(&q.id());
                ListEntry {
                    position,
                    id: q.id(),
                    prompt: q.prompt().to_owned(),
                    options: q.options().iter().map(|o| o.labeled()).collect(),
                    bookmarked: self.bookmarked.contains(&q.id()),
                    revealed,
                    correct_index: revealed.then(|| q.correct_answer_index()),
                }
            })
            .collect()
    }

    #[must_use]
    pub fn navigator(&self) -> Vec<NavigatorCell> {
        self.filtered_questions()
            .into_iter()
            .enumerate()
            .map(|(position, q)| NavigatorCell {
                position,
                id: q.id(),
                current: position == self.current_index,
                viewed: self.viewed.contains(&q.id()),
                bookmarked: self.bookmarked.contains(&q.id()),
                revealed: self.revealed.contains(&q.id()),
            })
            .collect()
    }

    // ─── navigation ───

    /// Move one step; returns `false` when the step would leave the filtered range.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        let target = match direction {
            Direction::Previous => self.current_index.checked_sub(1),
            Direction::Next => Some(self.current_index + 1),
        };
        match target {
            Some(index) if index < self.filtered_len() => {
                self.current_index = index;
                self.generation += 1;
                true
            }
            _ => false,
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` and leaves the state unchanged
    /// when `index` is outside the filtered questions.
    pub fn jump_to(&mut self, index: usize) -> Result<(), SessionError> {
        let len = self.filtered_len();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }
        self.current_index = index;
        self.generation += 1;
        Ok(())
    }

    /// Flip between all questions and bookmarked questions, returning the new mode.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoBookmarks` when switching to the bookmarked
    /// view with nothing bookmarked.
    pub fn toggle_filter_mode(&mut self) -> Result<FilterMode, SessionError> {
        self.filter = match self.filter {
            FilterMode::All if self.bookmarked.is_empty() => return Err(SessionError::NoBookmarks),
            FilterMode::All => FilterMode::BookmarkedOnly,
            FilterMode::BookmarkedOnly => FilterMode::All,
        };
        self.current_index = 0;
        self.generation += 1;
        Ok(self.filter)
    }

    // ─── per-question commands ───

    /// Record that the current question was displayed.
    pub fn mark_viewed(&mut self) -> Vec<SessionEffect> {
        let Some(id) = self.current_question().map(SessionQuestion::id) else {
            return Vec::new();
        };
        if self.viewed.insert(id) {
            self.persist_progress()
        } else {
            Vec::new()
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` when nothing is displayed.
    pub fn toggle_bookmark(&mut self) -> Result<BookmarkToggle, SessionError> {
        let id = self
            .current_question()
            .map(SessionQuestion::id)
            .ok_or(SessionError::NoCurrentQuestion)?;
        let bookmarked = if self.bookmarked.remove(&id) {
            false
        } else {
            self.bookmarked.insert(id);
            true
        };

        if self.filter == FilterMode::BookmarkedOnly && !bookmarked {
            let len = self.filtered_len();
            self.current_index = self.current_index.min(len.saturating_sub(1));
            self.generation += 1;
        }

        Ok(BookmarkToggle {
            bookmarked,
            effects: self.persist_progress(),
        })
    }

    /// Answer the current question with the option at `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` when nothing is displayed and
    /// `SessionError::InvalidOption` when `index` is not an option position.
    pub fn select_option(&mut self, index: usize) -> Result<Selection, SessionError> {
        let question = self
            .current_question()
            .ok_or(SessionError::NoCurrentQuestion)?;
        let id = question.id();
        let len = question.options().len();
        if index >= len {
            return Err(SessionError::InvalidOption { id, index, len });
        }
        let correct_index = question.correct_answer_index();
        let feedback = question.feedback_for(index).map(str::to_owned);

        if self.revealed.contains(&id) {
            return Ok(Selection {
                outcome: SelectionOutcome::AlreadyRevealed,
                effects: Vec::new(),
            });
        }
        if self.attempts.has_attempted(id, index) {
            return Ok(Selection {
                outcome: SelectionOutcome::AlreadyAttempted,
                effects: Vec::new(),
            });
        }

        let first_attempt = self.attempts.attempted(id).is_empty();
        let mut effects = Vec::new();

        if index == correct_index {
            if first_attempt {
                self.attempts.record_first_attempt(id, true);
                effects.extend(self.persist_shuffle());
            }
            if self.is_review() {
                effects.extend(self.origin_of(id).map(SessionEffect::ClearMiss));
            }
            self.revealed.insert(id);
            effects.extend(self.persist_progress());
            tracing::debug!(%id, first_attempt, "correct answer");

            return Ok(Selection {
                outcome: SelectionOutcome::Correct {
                    first_attempt,
                    completion: self.check_completion(),
                },
                effects,
            });
        }

        self.attempts.record_wrong(id, index);
        if first_attempt {
            self.attempts.record_first_attempt(id, false);
            effects.extend(self.origin_of(id).map(SessionEffect::RecordMiss));
        }
        effects.extend(self.persist_shuffle());
        let remaining = len - self.attempts.attempted(id).len();
        tracing::debug!(%id, index, remaining, "wrong answer");

        Ok(Selection {
            outcome: SelectionOutcome::Incorrect {
                feedback,
                remaining,
            },
            effects,
        })
    }

    /// Start over with a freshly shuffled question sequence.
    pub fn reset(&mut self, questions: Vec<SessionQuestion>, now: DateTime<Utc>) -> Vec<SessionEffect> {
        self.questions = questions;
        self.viewed.clear();
        self.bookmarked.clear();
        self.revealed.clear();
        self.attempts.clear();
        self.filter = FilterMode::All;
        self.current_index = 0;
        self.generation += 1;

        match &mut self.scope {
            SessionScope::Practice { locked_at, .. } => {
                *locked_at = now;
                vec![SessionEffect::DeletePersisted, SessionEffect::SaveShuffle]
            }
            SessionScope::Review { .. } => Vec::new(),
        }
    }

    // ─── explanation tickets ───

    /// Capture the current question view, or `None` when nothing is displayed.
    #[must_use]
    pub fn explanation_ticket(&self) -> Option<ExplanationTicket> {
        self.current_question().map(|q| ExplanationTicket {
            question_id: q.id(),
            generation: self.generation,
        })
    }

    /// True while the view the ticket was issued from is still displayed.
    #[must_use]
    pub fn accepts(&self, ticket: ExplanationTicket) -> bool {
        ticket.generation == self.generation
            && self.current_question().map(SessionQuestion::id) == Some(ticket.question_id)
    }

    // ─── persistence snapshots ───

    /// Progress snapshot for practice sessions.
    #[must_use]
    pub fn progress_record(&self, now: DateTime<Utc>) -> Option<ProgressRecord> {
        match self.scope {
            SessionScope::Practice { .. } => Some(ProgressRecord {
                viewed: self.viewed.clone(),
                bookmarked: self.bookmarked.clone(),
                revealed: self.revealed.clone(),
                last_updated: now,
            }),
            SessionScope::Review { .. } => None,
        }
    }

    /// The shuffle and attempts as they should be stored, for practice sessions.
    #[must_use]
    pub fn locked_shuffle(&self) -> Option<LockedShuffle> {
        match self.scope {
            SessionScope::Practice { locked_at, .. } => Some(LockedShuffle {
                questions: self.questions.clone(),
                attempts: self.attempts.clone(),
                locked_at,
            }),
            SessionScope::Review { .. } => None,
        }
    }

    fn origin_of(&self, id: QuestionId) -> Option<QuestionOrigin> {
        match &self.scope {
            SessionScope::Practice { topic, test, .. } => {
                Some(QuestionOrigin::new(topic.clone(), test.clone(), id))
            }
            SessionScope::Review { origins } => origins.get(&id).cloned(),
        }
    }

    fn persist_progress(&self) -> Vec<SessionEffect> {
        if self.is_review() {
            Vec::new()
        } else {
            vec![SessionEffect::SaveProgress]
        }
    }

    fn persist_shuffle(&self) -> Vec<SessionEffect> {
        if self.is_review() {
            Vec::new()
        } else {
            vec![SessionEffect::SaveShuffle]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcq_core::model::QuestionDraft;
    use mcq_core::time::fixed_now;
    use std::collections::BTreeMap;

    fn question(id: u64, correct: usize) -> SessionQuestion {
        let mut option_feedback = BTreeMap::new();
        option_feedback.insert((correct + 1) % 3, format!("Not quite ({id})."));
        let q = QuestionDraft {
            id: QuestionId::new(id),
            prompt: format!("Question {id}"),
            options: vec!["alpha".into(), "beta".into(), "gamma".into()],
            correct_answer: correct,
            explanation: String::new(),
            option_feedback,
        }
        .validate()
        .unwrap();
        SessionQuestion::in_source_order(&q)
    }

    fn topic_test() -> (TopicId, TestId) {
        (TopicId::new("ethics").unwrap(), TestId::new("p1").unwrap())
    }

    fn practice(n: u64) -> SessionState {
        let (topic, test) = topic_test();
        let questions = (1..=n).map(|id| question(id, 0)).collect();
        SessionState::practice(topic, test, LockedShuffle::new(questions, fixed_now()), None)
    }

    #[test]
    fn navigate_stays_in_bounds() {
        let mut state = practice(3);
        assert!(!state.navigate(Direction::Previous));
        assert!(state.navigate(Direction::Next));
        assert!(state.navigate(Direction::Next));
        assert!(!state.navigate(Direction::Next));
        assert_eq!(state.current_index(), 2);
        assert!(!state.can_go_next());
        assert!(state.can_go_previous());
    }

    #[test]
    fn jump_out_of_range_leaves_state() {
        let mut state = practice(2);
        state.jump_to(1).unwrap();
        assert_eq!(
            state.jump_to(2).unwrap_err(),
            SessionError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(state.current_index(), 1);
    }

    #[test]
    fn bookmarked_filter_requires_bookmarks() {
        let mut state = practice(3);
        assert_eq!(state.toggle_filter_mode().unwrap_err(), SessionError::NoBookmarks);
        assert_eq!(state.filter_mode(), FilterMode::All);

        state.jump_to(1).unwrap();
        assert!(state.toggle_bookmark().unwrap().bookmarked);
        assert_eq!(state.toggle_filter_mode().unwrap(), FilterMode::BookmarkedOnly);
        assert_eq!(state.current_index(), 0);
        let ids: Vec<_> = state.filtered_questions().iter().map(|q| q.id()).collect();
        assert_eq!(ids, vec![QuestionId::new(2)]);
    }

    #[test]
    fn unbookmarking_in_bookmarked_view_clamps_index() {
        let mut state = practice(3);
        state.jump_to(1).unwrap();
        state.toggle_bookmark().unwrap();
        state.jump_to(2).unwrap();
        state.toggle_bookmark().unwrap();
        state.toggle_filter_mode().unwrap();
        state.jump_to(1).unwrap();

        let toggle = state.toggle_bookmark().unwrap();
        assert!(!toggle.bookmarked);
        assert_eq!(toggle.effects, vec![SessionEffect::SaveProgress]);
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.current_question().unwrap().id(), QuestionId::new(2));
    }

    #[test]
    fn correct_selection_is_idempotent() {
        let mut state = practice(2);
        let first = state.select_option(0).unwrap();
        assert!(matches!(
            first.outcome,
            SelectionOutcome::Correct { first_attempt: true, .. }
        ));
        assert_eq!(
            first.effects,
            vec![SessionEffect::SaveShuffle, SessionEffect::SaveProgress]
        );

        let again = state.select_option(0).unwrap();
        assert_eq!(again.outcome, SelectionOutcome::AlreadyRevealed);
        assert!(again.effects.is_empty());
        assert_eq!(state.revealed().len(), 1);
        assert_eq!(state.attempts().first_attempt_correct(QuestionId::new(1)), Some(true));
    }

    #[test]
    fn repeated_wrong_selection_does_not_grow_attempts() {
        let mut state = practice(1);
        let wrong = state.select_option(1).unwrap();
        let (topic, test) = topic_test();
        assert_eq!(
            wrong.outcome,
            SelectionOutcome::Incorrect {
                feedback: Some("Not quite (1).".into()),
                remaining: 2,
            }
        );
        assert_eq!(
            wrong.effects,
            vec![
                SessionEffect::RecordMiss(QuestionOrigin::new(topic, test, QuestionId::new(1))),
                SessionEffect::SaveShuffle,
            ]
        );

        let repeat = state.select_option(1).unwrap();
        assert_eq!(repeat.outcome, SelectionOutcome::AlreadyAttempted);
        assert_eq!(state.attempts().attempted(QuestionId::new(1)), &[1]);

        let second_wrong = state.select_option(2).unwrap();
        assert_eq!(second_wrong.effects, vec![SessionEffect::SaveShuffle]);
        assert_eq!(
            state.attempts().first_attempt_correct(QuestionId::new(1)),
            Some(false)
        );
    }

    #[test]
    fn invalid_option_is_rejected() {
        let mut state = practice(1);
        assert!(matches!(
            state.select_option(3).unwrap_err(),
            SessionError::InvalidOption { index: 3, len: 3, .. }
        ));
    }

    #[test]
    fn completion_counts_filtered_first_attempts() {
        let mut state = practice(3);
        state.select_option(0).unwrap();
        state.navigate(Direction::Next);
        state.select_option(2).unwrap();
        state.select_option(0).unwrap();
        assert!(!state.check_completion().complete);

        state.navigate(Direction::Next);
        let selection = state.select_option(0).unwrap();
        let SelectionOutcome::Correct { completion, .. } = selection.outcome else {
            panic!("expected correct outcome");
        };
        assert_eq!(
            completion,
            Completion {
                complete: true,
                correct_first_attempt: 2,
                total: 3
            }
        );
    }

    #[test]
    fn completion_in_bookmarked_view_ignores_other_questions() {
        let mut state = practice(3);
        for index in [1, 2] {
            state.jump_to(index).unwrap();
            state.toggle_bookmark().unwrap();
        }
        state.toggle_filter_mode().unwrap();

        state.select_option(0).unwrap();
        state.navigate(Direction::Next);
        state.select_option(1).unwrap();
        let selection = state.select_option(0).unwrap();
        let SelectionOutcome::Correct { completion, .. } = selection.outcome else {
            panic!("expected correct outcome");
        };
        assert_eq!(
            completion,
            Completion {
                complete: true,
                correct_first_attempt: 1,
                total: 2
            }
        );
        assert!(!state.is_revealed(QuestionId::new(1)));
    }

    #[test]
    fn index_stays_in_bounds_across_mixed_commands() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let mut state = practice(5);
        for step in 0..500 {
            match rng.random_range(0..5) {
                0 => {
                    state.navigate(Direction::Next);
                }
                1 => {
                    state.navigate(Direction::Previous);
                }
                2 => {
                    let _ = state.jump_to(rng.random_range(0..7));
                }
                3 => {
                    let _ = state.toggle_bookmark();
                }
                _ => {
                    let _ = state.toggle_filter_mode();
                }
            }

            let len = state.filtered_questions().len();
            if len == 0 {
                assert!(state.current_question().is_none(), "step {step}");
            } else {
                assert!(state.current_index() < len, "step {step}");
                assert!(state.current_question().is_some(), "step {step}");
            }
        }
    }

    #[test]
    fn mark_viewed_persists_once() {
        let mut state = practice(2);
        assert_eq!(state.mark_viewed(), vec![SessionEffect::SaveProgress]);
        assert!(state.mark_viewed().is_empty());
        assert_eq!(state.progress().viewed, 1);
        assert!(state.navigator()[0].current);
        assert!(state.navigator()[0].viewed);
        assert!(!state.navigator()[1].viewed);
    }

    #[test]
    fn list_view_hides_unrevealed_answers() {
        let mut state = practice(2);
        state.select_option(0).unwrap();
        let list = state.list_view();
        assert_eq!(list[0].correct_index, Some(0));
        assert_eq!(list[1].correct_index, None);
        assert_eq!(list[0].options[0], "A. alpha");
    }

    #[test]
    fn ticket_is_rejected_after_moving_away() {
        let mut state = practice(2);
        let ticket = state.explanation_ticket().unwrap();
        assert!(state.accepts(ticket));

        state.navigate(Direction::Next);
        assert!(!state.accepts(ticket));
        state.navigate(Direction::Previous);
        assert!(!state.accepts(ticket));
    }

    #[test]
    fn review_session_persists_only_ledger_changes() {
        let (topic, test) = topic_test();
        let origin = QuestionOrigin::new(topic, test, QuestionId::new(1));
        let origins = HashMap::from([(QuestionId::new(1), origin.clone())]);
        let mut state = SessionState::review(vec![question(1, 0)], origins);

        assert!(state.mark_viewed().is_empty());
        assert!(state.toggle_bookmark().unwrap().effects.is_empty());
        let selection = state.select_option(0).unwrap();
        assert_eq!(selection.effects, vec![SessionEffect::ClearMiss(origin)]);
        assert!(state.progress_record(fixed_now()).is_none());
        assert!(state.locked_shuffle().is_none());
    }

    #[test]
    fn practice_restores_known_progress_only() {
        let (topic, test) = topic_test();
        let mut record = ProgressRecord::empty(fixed_now());
        record.viewed.extend([QuestionId::new(1), QuestionId::new(99)]);
        record.revealed.insert(QuestionId::new(1));
        let state = SessionState::practice(
            topic,
            test,
            LockedShuffle::new(vec![question(1, 0)], fixed_now()),
            Some(record),
        );
        assert_eq!(state.viewed().len(), 1);
        assert!(state.check_completion().complete);
    }

    #[test]
    fn reset_clears_everything_and_requests_cleanup() {
        let mut state = practice(2);
        state.mark_viewed();
        state.toggle_bookmark().unwrap();
        state.select_option(1).unwrap();
        state.toggle_filter_mode().unwrap();

        let later = fixed_now() + chrono::Duration::hours(1);
        let effects = state.reset(vec![question(2, 1), question(1, 0)], later);
        assert_eq!(
            effects,
            vec![SessionEffect::DeletePersisted, SessionEffect::SaveShuffle]
        );
        assert!(state.viewed().is_empty() && state.bookmarked().is_empty());
        assert!(state.attempts().is_empty());
        assert_eq!(state.filter_mode(), FilterMode::All);
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.locked_shuffle().unwrap().locked_at, later);
    }

    #[test]
    fn empty_filtered_set_reports_complete() {
        let (topic, test) = topic_test();
        let state = SessionState::practice(
            topic,
            test,
            LockedShuffle::new(Vec::new(), fixed_now()),
            None,
        );
        assert!(state.current_question().is_none());
        assert_eq!(
            state.check_completion(),
            Completion {
                complete: true,
                correct_first_attempt: 0,
                total: 0
            }
        );
    }
}

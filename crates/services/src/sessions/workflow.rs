use std::collections::HashMap;
use std::sync::Arc;

use mcq_core::model::{LockedShuffle, Question, TestId, TopicId};
use storage::repository::Storage;
use storage::stores::{LedgerStore, ProgressStore, ShuffleStore};

use super::state::{Selection, SessionEffect, SessionScope, SessionState};
use crate::Clock;
use crate::catalog::{QuestionSource, build_review_set};
use crate::error::{SessionError, StudyError};
use crate::shuffle::ShuffleEngine;

/// Runs session commands and persists the effects they produce.
#[derive(Clone)]
pub struct StudyService {
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    progress: ProgressStore,
    shuffles: ShuffleStore,
    ledger: LedgerStore,
}

impl StudyService {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, source: Arc<dyn QuestionSource>) -> Self {
        Self {
            clock,
            source,
            progress: storage.progress.clone(),
            shuffles: storage.shuffles.clone(),
            ledger: storage.wrong_answers.clone(),
        }
    }

    #[must_use]
    pub fn source(&self) -> Arc<dyn QuestionSource> {
        Arc::clone(&self.source)
    }

    /// Load a practice test, reusing its locked shuffle when it still matches
    /// the question set, and restore stored progress.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Resource` when the set cannot be loaded,
    /// `SessionError::Empty` when it has no questions, and storage errors.
    pub async fn open_practice_test(
        &self,
        topic: &TopicId,
        test: &TestId,
    ) -> Result<SessionState, StudyError> {
        let questions = self.source.question_set(topic, test).await?;
        if questions.is_empty() {
            return Err(SessionError::Empty.into());
        }

        let (shuffle, resumed) = match self.shuffles.load(topic, test).await? {
            Some(locked) if locked.matches_source(&questions) => (locked, true),
            stale => {
                if stale.is_some() {
                    tracing::warn!(%topic, %test, "question set changed; discarding locked shuffle");
                }
                let locked = self.lock_new_shuffle(&questions)?;
                self.shuffles.save(topic, test, &locked).await?;
                (locked, false)
            }
        };
        let progress = self.progress.load(topic, test).await?;

        tracing::info!(%topic, %test, questions = questions.len(), resumed, "opened practice test");
        Ok(SessionState::practice(
            topic.clone(),
            test.clone(),
            shuffle,
            progress,
        ))
    }

    /// Build a review session from the wrong-answer ledger.
    ///
    /// Returns `Ok(None)` when nothing resolves to a question.
    ///
    /// # Errors
    ///
    /// Returns `StudyError` when the ledger cannot be read.
    pub async fn open_review(&self) -> Result<Option<SessionState>, StudyError> {
        let ledger = self.ledger.load().await?;
        let items = build_review_set(ledger.entries(), self.source.as_ref()).await;
        if items.is_empty() {
            tracing::info!(entries = ledger.len(), "nothing to review");
            return Ok(None);
        }

        let questions: Vec<Question> = items.iter().map(|i| i.question.clone()).collect();
        let origins: HashMap<_, _> = items
            .into_iter()
            .map(|i| (i.question.id(), i.origin))
            .collect();
        let shuffled = ShuffleEngine::shuffle(&questions)?;

        tracing::info!(questions = shuffled.len(), entries = ledger.len(), "opened review");
        Ok(Some(SessionState::review(shuffled, origins)))
    }

    /// Mark the displayed question as viewed.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` when progress cannot be saved.
    pub async fn view_current(&self, state: &mut SessionState) -> Result<(), StudyError> {
        let effects = state.mark_viewed();
        self.apply(state, &effects).await
    }

    /// # Errors
    ///
    /// Returns `SessionError` for invalid selections and storage errors when
    /// effects cannot be persisted.
    pub async fn select_option(
        &self,
        state: &mut SessionState,
        index: usize,
    ) -> Result<Selection, StudyError> {
        let selection = state.select_option(index)?;
        self.apply(state, &selection.effects).await?;
        Ok(selection)
    }

    /// Returns whether the question is now bookmarked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` or storage errors.
    pub async fn toggle_bookmark(&self, state: &mut SessionState) -> Result<bool, StudyError> {
        let toggle = state.toggle_bookmark()?;
        self.apply(state, &toggle.effects).await?;
        Ok(toggle.bookmarked)
    }

    /// Clear all progress and reshuffle from the source set.
    ///
    /// Review sessions are rebuilt from the current ledger instead.
    ///
    /// # Errors
    ///
    /// Returns `StudyError` when the source set or storage is unavailable.
    pub async fn reset_session(&self, state: &mut SessionState) -> Result<(), StudyError> {
        let (topic, test) = match state.scope() {
            SessionScope::Practice { topic, test, .. } => (topic.clone(), test.clone()),
            SessionScope::Review { .. } => {
                if let Some(fresh) = self.open_review().await? {
                    *state = fresh;
                } else {
                    *state = SessionState::review(Vec::new(), HashMap::new());
                }
                return Ok(());
            }
        };

        let questions = self.source.question_set(&topic, &test).await?;
        let shuffled = ShuffleEngine::shuffle(&questions)?;
        let effects = state.reset(shuffled, self.clock.now());
        self.apply(state, &effects).await?;
        tracing::info!(%topic, %test, "reset practice test");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StudyError::Storage` when the ledger cannot be removed.
    pub async fn clear_wrong_answers(&self) -> Result<(), StudyError> {
        self.ledger.clear_all().await?;
        tracing::info!("cleared wrong answers");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StudyError::Storage` when the ledger cannot be read.
    pub async fn wrong_answer_count(&self) -> Result<usize, StudyError> {
        Ok(self.ledger.count().await?)
    }

    fn lock_new_shuffle(&self, questions: &[Question]) -> Result<LockedShuffle, StudyError> {
        Ok(LockedShuffle::new(
            ShuffleEngine::shuffle(questions)?,
            self.clock.now(),
        ))
    }

    async fn apply(&self, state: &SessionState, effects: &[SessionEffect]) -> Result<(), StudyError> {
        let now = self.clock.now();
        for effect in effects {
            tracing::debug!(?effect, "applying session effect");
            match effect {
                SessionEffect::SaveProgress => {
                    if let (SessionScope::Practice { topic, test, .. }, Some(record)) =
                        (state.scope(), state.progress_record(now))
                    {
                        self.progress.save(topic, test, &record).await?;
                    }
                }
                SessionEffect::SaveShuffle => {
                    if let (SessionScope::Practice { topic, test, .. }, Some(locked)) =
                        (state.scope(), state.locked_shuffle())
                    {
                        self.shuffles.save(topic, test, &locked).await?;
                    }
                }
                SessionEffect::RecordMiss(origin) => {
                    self.ledger.record(origin.clone(), now).await?;
                }
                SessionEffect::ClearMiss(origin) => {
                    self.ledger.remove_scoped(origin).await?;
                }
                SessionEffect::DeletePersisted => {
                    if let SessionScope::Practice { topic, test, .. } = state.scope() {
                        self.progress.remove(topic, test).await?;
                        self.shuffles.remove(topic, test).await?;
                    }
                }
            }
        }
        Ok(())
    }
}

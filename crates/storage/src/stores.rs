//! Typed stores over a [`KeyValueStore`].
//!
//! Values are JSON. A record that no longer decodes is logged and treated as
//! absent, so a damaged entry costs the learner that entry and nothing else.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mcq_core::model::{
    LockedShuffle, ProgressRecord, QuestionId, QuestionOrigin, TestId, Topic, TopicId,
    WrongAnswerLedger, completion_percent,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::keys::{WRONG_ANSWERS_KEY, progress_key, shuffle_key};
use crate::repository::{KeyValueStore, StorageError};

fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "discarding undecodable record");
            None
        }
    }
}

async fn load_json<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    Ok(kv.get(key).await?.and_then(|raw| decode(key, &raw)))
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Per-test progress records under `progress:<topic>:<test>`.
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be encoded or written.
    pub async fn save(
        &self,
        topic: &TopicId,
        test: &TestId,
        record: &ProgressRecord,
    ) -> Result<(), StorageError> {
        let key = progress_key(topic, test);
        self.kv.set(&key, &encode(record)?).await?;
        tracing::debug!(%key, viewed = record.viewed.len(), "saved progress");
        Ok(())
    }

    /// Stored progress, or `None` when nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn load(
        &self,
        topic: &TopicId,
        test: &TestId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        load_json(self.kv.as_ref(), &progress_key(topic, test)).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn remove(&self, topic: &TopicId, test: &TestId) -> Result<(), StorageError> {
        self.kv.delete(&progress_key(topic, test)).await
    }

    /// Viewed share of one test, in whole percent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn completion_percent(
        &self,
        topic: &TopicId,
        test: &TestId,
        total_questions: usize,
    ) -> Result<u8, StorageError> {
        let viewed = self
            .load(topic, test)
            .await?
            .map_or(0, |record| record.viewed.len());
        Ok(completion_percent(viewed, total_questions))
    }

    /// Viewed share across every test of `topic` that advertises questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn topic_completion_percent(&self, topic: &Topic) -> Result<u8, StorageError> {
        let mut viewed = 0_usize;
        let mut total = 0_usize;
        for test in topic.practice_tests.iter().filter(|t| t.question_count > 0) {
            let count = test.question_count as usize;
            total += count;
            if let Some(record) = self.load(&topic.id, &test.id).await? {
                viewed += record.viewed.len().min(count);
            }
        }
        Ok(completion_percent(viewed, total))
    }
}

//
// ─── SHUFFLES ──────────────────────────────────────────────────────────────────
//

/// Locked shuffles under `shuffle:<topic>:<test>`.
#[derive(Clone)]
pub struct ShuffleStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ShuffleStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the shuffle cannot be encoded or written.
    pub async fn save(
        &self,
        topic: &TopicId,
        test: &TestId,
        shuffle: &LockedShuffle,
    ) -> Result<(), StorageError> {
        self.kv
            .set(&shuffle_key(topic, test), &encode(shuffle)?)
            .await
    }

    /// The locked shuffle, if one is stored and structurally sound.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn load(
        &self,
        topic: &TopicId,
        test: &TestId,
    ) -> Result<Option<LockedShuffle>, StorageError> {
        let key = shuffle_key(topic, test);
        let Some(shuffle) = load_json::<LockedShuffle>(self.kv.as_ref(), &key).await? else {
            return Ok(None);
        };
        if shuffle.is_consistent() {
            Ok(Some(shuffle))
        } else {
            tracing::warn!(%key, "discarding inconsistent shuffle");
            Ok(None)
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn remove(&self, topic: &TopicId, test: &TestId) -> Result<(), StorageError> {
        self.kv.delete(&shuffle_key(topic, test)).await
    }
}

//
// ─── WRONG ANSWERS ─────────────────────────────────────────────────────────────
//

/// The global wrong-answer ledger under `wrong-answers`.
///
/// Every mutation is a read-modify-write of the whole ledger.
#[derive(Clone)]
pub struct LedgerStore {
    kv: Arc<dyn KeyValueStore>,
}

impl LedgerStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn load(&self) -> Result<WrongAnswerLedger, StorageError> {
        Ok(load_json(self.kv.as_ref(), WRONG_ANSWERS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, ledger: &WrongAnswerLedger) -> Result<(), StorageError> {
        self.kv.set(WRONG_ANSWERS_KEY, &encode(ledger)?).await
    }

    /// Record a miss; returns `true` when the entry is new.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read or written.
    pub async fn record(
        &self,
        origin: QuestionOrigin,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut ledger = self.load().await?;
        let added = ledger.record(origin, at);
        if added {
            self.save(&ledger).await?;
        }
        Ok(added)
    }

    /// Drop every entry for `question_id` across topics and tests.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read or written.
    pub async fn remove(&self, question_id: QuestionId) -> Result<usize, StorageError> {
        let mut ledger = self.load().await?;
        let removed = ledger.remove(question_id);
        if removed > 0 {
            self.save(&ledger).await?;
        }
        Ok(removed)
    }

    /// Drop the single entry matching `origin`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read or written.
    pub async fn remove_scoped(&self, origin: &QuestionOrigin) -> Result<bool, StorageError> {
        let mut ledger = self.load().await?;
        let removed = ledger.remove_scoped(origin);
        if removed {
            self.save(&ledger).await?;
        }
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        self.kv.delete(WRONG_ANSWERS_KEY).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    pub async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.load().await?.len())
    }
}

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};

use crate::model::{ConversationRecord, LearnedAnswer, PendingQuestion};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("pending question {0:?} not found")]
    NotFound(String),

    #[error("pending question {0:?} has no operator answer")]
    NotAnswered(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Learned answers and pending questions. Every write is atomic with
/// respect to other writes on the same store.
pub trait QuestionStore: Send + Sync {
    fn learned_answers(&self) -> Result<Vec<LearnedAnswer>, StoreError>;

    fn pending_questions(&self) -> Result<Vec<PendingQuestion>, StoreError>;

    /// Insert-or-refresh by key. A new row starts without an answer; an
    /// existing row keeps its answer and takes the new asker and time.
    fn upsert_pending(
        &self,
        question: &str,
        original: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PendingQuestion, StoreError>;

    fn answer_pending(&self, question: &str, answer: &str) -> Result<PendingQuestion, StoreError>;

    /// Move the operator answer of a pending row into the learned answers
    /// and drop the row, as one step.
    fn promote_pending(&self, question: &str, at: DateTime<Utc>)
        -> Result<LearnedAnswer, StoreError>;

    /// Upsert a learned answer and drop any pending row with the same key.
    fn teach(&self, answer: LearnedAnswer) -> Result<(), StoreError>;

    fn remove_pending(&self, question: &str) -> Result<bool, StoreError>;
}

/// Append-only sink for chat exchanges.
pub trait ConversationLog: Send + Sync {
    fn append(&self, record: &ConversationRecord) -> Result<(), StoreError>;
}

/// In-memory keyed collections. Durable stores replay their log into one
/// of these and apply every write to it.
#[derive(Debug, Default, Clone)]
pub struct QuestionCatalog {
    learned: BTreeMap<String, LearnedAnswer>,
    pending: BTreeMap<String, PendingQuestion>,
}

impl QuestionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learned(&self) -> impl Iterator<Item = &LearnedAnswer> {
        self.learned.values()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingQuestion> {
        self.pending.values()
    }

    pub fn learned_answer(&self, question: &str) -> Option<&LearnedAnswer> {
        self.learned.get(question)
    }

    pub fn pending_question(&self, question: &str) -> Option<&PendingQuestion> {
        self.pending.get(question)
    }

    pub fn learned_count(&self) -> usize {
        self.learned.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn put_learned(&mut self, answer: LearnedAnswer) {
        self.learned.insert(answer.question.clone(), answer);
    }

    pub fn put_pending(&mut self, question: PendingQuestion) {
        self.pending.insert(question.question.clone(), question);
    }

    /// Row that an upsert of `question` would leave behind.
    pub fn refreshed_pending(
        &self,
        question: &str,
        original: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> PendingQuestion {
        match self.pending.get(question) {
            Some(row) => PendingQuestion {
                original: original.to_string(),
                user_id: user_id.to_string(),
                timestamp: at,
                ..row.clone()
            },
            None => PendingQuestion {
                question: question.to_string(),
                original: original.to_string(),
                user_id: user_id.to_string(),
                timestamp: at,
                admin_response: None,
            },
        }
    }

    pub fn upsert_pending(
        &mut self,
        question: &str,
        original: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> PendingQuestion {
        let row = self.refreshed_pending(question, original, user_id, at);
        self.put_pending(row.clone());
        row
    }

    /// Row that answering `question` would leave behind.
    pub fn answered_pending(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<PendingQuestion, StoreError> {
        let row = self
            .pending
            .get(question)
            .ok_or_else(|| StoreError::NotFound(question.to_string()))?;
        Ok(PendingQuestion {
            admin_response: Some(answer.to_string()),
            ..row.clone()
        })
    }

    pub fn answer_pending(
        &mut self,
        question: &str,
        answer: &str,
    ) -> Result<PendingQuestion, StoreError> {
        let row = self.answered_pending(question, answer)?;
        self.put_pending(row.clone());
        Ok(row)
    }

    /// Learned answer that promoting `question` would produce.
    pub fn promotion(
        &self,
        question: &str,
        at: DateTime<Utc>,
    ) -> Result<LearnedAnswer, StoreError> {
        let row = self
            .pending
            .get(question)
            .ok_or_else(|| StoreError::NotFound(question.to_string()))?;
        let answer = row
            .answer()
            .ok_or_else(|| StoreError::NotAnswered(question.to_string()))?;
        Ok(LearnedAnswer {
            question: row.question.clone(),
            answer: answer.to_string(),
            learned_at: at,
            addresses_user: false,
        })
    }

    pub fn teach(&mut self, answer: LearnedAnswer) {
        self.pending.remove(&answer.question);
        self.put_learned(answer);
    }

    pub fn remove_pending(&mut self, question: &str) -> bool {
        self.pending.remove(question).is_some()
    }
}

/// Volatile store, used for embedding without a data directory and in
/// tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<QuestionCatalog>,
    conversations: Mutex<Vec<ConversationRecord>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> Result<Vec<ConversationRecord>, StoreError> {
        Ok(self.conversations.lock().map_err(poisoned)?.clone())
    }
}

impl QuestionStore for MemoryStore {
    fn learned_answers(&self) -> Result<Vec<LearnedAnswer>, StoreError> {
        let catalog = self.catalog.read().map_err(poisoned)?;
        Ok(catalog.learned().cloned().collect())
    }

    fn pending_questions(&self) -> Result<Vec<PendingQuestion>, StoreError> {
        let catalog = self.catalog.read().map_err(poisoned)?;
        Ok(catalog.pending().cloned().collect())
    }

    fn upsert_pending(
        &self,
        question: &str,
        original: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PendingQuestion, StoreError> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        Ok(catalog.upsert_pending(question, original, user_id, at))
    }

    fn answer_pending(&self, question: &str, answer: &str) -> Result<PendingQuestion, StoreError> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        catalog.answer_pending(question, answer)
    }

    fn promote_pending(
        &self,
        question: &str,
        at: DateTime<Utc>,
    ) -> Result<LearnedAnswer, StoreError> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        let learned = catalog.promotion(question, at)?;
        catalog.teach(learned.clone());
        Ok(learned)
    }

    fn teach(&self, answer: LearnedAnswer) -> Result<(), StoreError> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        catalog.teach(answer);
        Ok(())
    }

    fn remove_pending(&self, question: &str) -> Result<bool, StoreError> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        Ok(catalog.remove_pending(question))
    }
}

impl ConversationLog for MemoryStore {
    fn append(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        self.conversations
            .lock()
            .map_err(poisoned)?
            .push(record.clone());
        Ok(())
    }
}

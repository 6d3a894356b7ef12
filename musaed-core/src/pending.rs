//! Questions waiting for an operator.
//!
//! Rows are keyed by normalized text. An operator may answer a row without
//! promoting it; such answers are reused for close rewordings under a stricter
//! threshold than learned answers.

use std::sync::Arc;

use chrono::Utc;
use musaed_text::{AnalyzedText, Similarity, TextAnalyzer};
use tracing::{debug, info};

use crate::cache::LearnedAnswerCache;
use crate::model::{LearnedAnswer, PendingQuestion};
use crate::resolver::{Match, Resolver, Tier};
use crate::store::{QuestionStore, StoreError};

pub struct PendingQuestionQueue {
    store: Arc<dyn QuestionStore>,
    analyzer: Arc<TextAnalyzer>,
    learned_cache: Arc<LearnedAnswerCache>,
    similarity: Box<dyn Similarity>,
    threshold: f64,
}

impl PendingQuestionQueue {
    pub fn new(
        store: Arc<dyn QuestionStore>,
        analyzer: Arc<TextAnalyzer>,
        learned_cache: Arc<LearnedAnswerCache>,
        similarity: Box<dyn Similarity>,
        threshold: f64,
    ) -> Self {
        Self {
            store,
            analyzer,
            learned_cache,
            similarity,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Register or refresh `raw_question`. Returns `None` when the message
    /// normalizes to nothing and there is no key to file it under.
    pub fn upsert(
        &self,
        raw_question: &str,
        user_id: &str,
    ) -> Result<Option<PendingQuestion>, StoreError> {
        let question = self.analyzer.normalize(raw_question);
        self.upsert_normalized(&question, raw_question, user_id)
    }

    pub(crate) fn upsert_normalized(
        &self,
        question: &str,
        raw_question: &str,
        user_id: &str,
    ) -> Result<Option<PendingQuestion>, StoreError> {
        if question.is_empty() {
            return Ok(None);
        }
        let row = self
            .store
            .upsert_pending(question, raw_question.trim(), user_id, Utc::now())?;
        debug!(question = %row.question, user_id, "pending question registered");
        Ok(Some(row))
    }

    /// Best operator-answered row whose question is close enough to
    /// `normalized`.
    pub fn find_answered(
        &self,
        normalized: &str,
    ) -> Result<Option<(PendingQuestion, f64)>, StoreError> {
        let mut best: Option<(PendingQuestion, f64)> = None;
        for row in self.store.pending_questions()? {
            if row.answer().is_none() {
                continue;
            }
            let score = if row.question == normalized {
                1.0
            } else {
                self.similarity.similarity(normalized, &row.question)
            };
            if score > self.threshold && best.as_ref().map_or(true, |(_, top)| score > *top) {
                best = Some((row, score));
            }
        }
        Ok(best)
    }

    /// Attach an operator answer without promoting.
    pub fn answer(&self, question: &str, answer: &str) -> Result<PendingQuestion, StoreError> {
        let key = self.analyzer.normalize(question);
        let row = self.store.answer_pending(&key, answer.trim())?;
        info!(question = %row.question, "pending question answered");
        Ok(row)
    }

    /// Turn the answered row into a learned answer and drop it.
    pub fn promote(&self, question: &str) -> Result<LearnedAnswer, StoreError> {
        let key = self.analyzer.normalize(question);
        let learned = self.store.promote_pending(&key, Utc::now())?;
        self.learned_cache.invalidate();
        info!(question = %learned.question, "pending question promoted");
        Ok(learned)
    }

    /// Drop the row without learning anything. `false` when absent.
    pub fn discard(&self, question: &str) -> Result<bool, StoreError> {
        let key = self.analyzer.normalize(question);
        let removed = self.store.remove_pending(&key)?;
        if removed {
            info!(question = %key, "pending question discarded");
        }
        Ok(removed)
    }

    /// Most recently asked first.
    pub fn list(&self) -> Result<Vec<PendingQuestion>, StoreError> {
        let mut rows = self.store.pending_questions()?;
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.question.cmp(&b.question)));
        Ok(rows)
    }
}

impl Resolver for PendingQuestionQueue {
    fn tier(&self) -> Tier {
        Tier::PendingAnswer
    }

    fn try_resolve(&self, message: &AnalyzedText) -> Result<Option<Match>, StoreError> {
        let found = self.find_answered(&message.normalized)?;
        Ok(found.and_then(|(row, score)| {
            debug!(question = %row.question, score, "pending answer reused");
            row.answer().map(|answer| Match {
                text: answer.to_string(),
                score,
                addresses_user: false,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use musaed_text::EditRatio;

    fn setup() -> (PendingQuestionQueue, Arc<LearnedAnswerCache>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(LearnedAnswerCache::default());
        let queue = PendingQuestionQueue::new(
            store.clone(),
            Arc::new(TextAnalyzer::default()),
            cache.clone(),
            Box::new(EditRatio),
            0.8,
        );
        (queue, cache, store)
    }

    #[test]
    fn upsert_coalesces_by_normalized_form() {
        let (queue, _, _) = setup();
        queue.upsert("Do you do marble polishing?", "alice").unwrap();
        let row = queue.upsert("do you do MARBLE polishing", "bob").unwrap().unwrap();

        let rows = queue.list().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(row.user_id, "bob");
        assert_eq!(row.original, "do you do MARBLE polishing");
        assert!(row.admin_response.is_none());
    }

    #[test]
    fn upsert_skips_empty_key() {
        let (queue, _, _) = setup();
        assert!(queue.upsert("حضرتك يافندم", "u").unwrap().is_none());
        assert!(queue.list().unwrap().is_empty());
    }

    #[test]
    fn reasking_keeps_unpromoted_answer() {
        let (queue, _, _) = setup();
        queue.upsert("marble polishing", "alice").unwrap();
        queue.answer("marble polishing", "Yes, we polish marble.").unwrap();
        queue.upsert("Marble polishing!", "bob").unwrap();

        let (row, score) = queue.find_answered("marble polishing").unwrap().unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(row.admin_response.as_deref(), Some("Yes, we polish marble."));
    }

    #[test]
    fn find_answered_uses_strict_threshold() {
        let (queue, _, _) = setup();
        queue.upsert("marble polishing", "alice").unwrap();
        queue.answer("marble polishing", "Yes.").unwrap();

        // one character off
        assert!(queue.find_answered("marble polishin").unwrap().is_some());
        assert!(queue.find_answered("marble floor").unwrap().is_none());
    }

    #[test]
    fn unanswered_rows_are_not_reused() {
        let (queue, _, _) = setup();
        queue.upsert("marble polishing", "alice").unwrap();
        assert!(queue.find_answered("marble polishing").unwrap().is_none());
    }

    #[test]
    fn promote_removes_row_and_invalidates_cache() {
        let (queue, cache, store) = setup();
        cache.replace(Vec::new());
        queue.upsert("marble polishing", "alice").unwrap();
        queue.answer("marble polishing", "Yes.").unwrap();

        let learned = queue.promote("marble polishing").unwrap();
        assert_eq!(learned.question, "marble polishing");
        assert!(queue.list().unwrap().is_empty());
        assert!(!cache.is_loaded());

        let learned_rows = store.learned_answers().unwrap();
        assert_eq!(learned_rows.len(), 1);
    }

    #[test]
    fn promote_without_answer_fails() {
        let (queue, _, _) = setup();
        queue.upsert("marble polishing", "alice").unwrap();
        assert!(matches!(
            queue.promote("marble polishing"),
            Err(StoreError::NotAnswered(_))
        ));
        assert_eq!(queue.list().unwrap().len(), 1);
    }

    #[test]
    fn discard_removes_without_learning() {
        let (queue, _, store) = setup();
        queue.upsert("marble polishing", "alice").unwrap();
        assert!(queue.discard("marble polishing").unwrap());
        assert!(!queue.discard("marble polishing").unwrap());
        assert!(store.learned_answers().unwrap().is_empty());
    }
}

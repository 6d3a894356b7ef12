//! Operator-taught answers, matched fuzzily against the cached catalog.

use std::sync::Arc;

use chrono::Utc;
use musaed_text::{keyword_overlap, AnalyzedText, Similarity, TextAnalyzer};
use tracing::{debug, info};

use crate::cache::{CachedAnswer, LearnedAnswerCache};
use crate::model::LearnedAnswer;
use crate::resolver::{Match, Resolver, Tier};
use crate::store::{QuestionStore, StoreError};

/// Best learned answer for a message and the score it won with.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAnswer {
    pub answer: LearnedAnswer,
    pub score: f64,
}

pub struct LearnedAnswerStore {
    store: Arc<dyn QuestionStore>,
    analyzer: Arc<TextAnalyzer>,
    cache: Arc<LearnedAnswerCache>,
    similarity: Box<dyn Similarity>,
    threshold: f64,
}

impl LearnedAnswerStore {
    pub fn new(
        store: Arc<dyn QuestionStore>,
        analyzer: Arc<TextAnalyzer>,
        cache: Arc<LearnedAnswerCache>,
        similarity: Box<dyn Similarity>,
        threshold: f64,
    ) -> Self {
        Self {
            store,
            analyzer,
            cache,
            similarity,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Reload the cache from the store.
    pub fn refresh(&self) -> Result<usize, StoreError> {
        Ok(self.load()?.len())
    }

    fn load(&self) -> Result<Arc<Vec<CachedAnswer>>, StoreError> {
        let answers = self.store.learned_answers()?;
        let cached: Vec<CachedAnswer> = answers
            .into_iter()
            .map(|answer| {
                let normalized = self.analyzer.normalize(&answer.question);
                CachedAnswer {
                    keywords: self.analyzer.keywords(&normalized),
                    normalized,
                    answer,
                }
            })
            .collect();
        let snapshot = self.cache.replace(cached);
        debug!(count = snapshot.len(), "learned answer cache refreshed");
        Ok(snapshot)
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// A concurrent invalidate or an elapsed TTL can empty the cache right
    /// after a reload; the freshly loaded snapshot is served regardless.
    fn snapshot(&self) -> Result<Arc<Vec<CachedAnswer>>, StoreError> {
        match self.cache.get() {
            Some(snapshot) => Ok(snapshot),
            None => self.load(),
        }
    }

    /// Exact normalized match scores 1.0 and wins at once. Otherwise every
    /// pair is scored as the larger of string similarity and keyword
    /// overlap, and the best one is served if it beats the threshold.
    pub fn lookup(&self, message: &AnalyzedText) -> Result<Option<ScoredAnswer>, StoreError> {
        let snapshot = self.snapshot()?;
        let mut best: Option<(&CachedAnswer, f64)> = None;
        for cached in snapshot.iter() {
            if cached.normalized == message.normalized {
                return Ok(Some(ScoredAnswer {
                    answer: cached.answer.clone(),
                    score: 1.0,
                }));
            }
            let score = self
                .similarity
                .similarity(&message.normalized, &cached.normalized)
                .max(keyword_overlap(&message.keywords, &cached.keywords));
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((cached, score));
            }
        }

        Ok(best
            .filter(|(_, score)| *score > self.threshold)
            .map(|(cached, score)| ScoredAnswer {
                answer: cached.answer.clone(),
                score,
            }))
    }

    /// Upsert a learned answer directly. Any pending row for the same
    /// question is dropped.
    pub fn teach(
        &self,
        question: &str,
        answer: &str,
        addresses_user: bool,
    ) -> Result<LearnedAnswer, StoreError> {
        let learned = LearnedAnswer {
            question: self.analyzer.normalize(question),
            answer: answer.trim().to_string(),
            learned_at: Utc::now(),
            addresses_user,
        };
        self.store.teach(learned.clone())?;
        self.cache.invalidate();
        info!(question = %learned.question, "learned answer taught");
        Ok(learned)
    }

    pub fn all(&self) -> Result<Vec<LearnedAnswer>, StoreError> {
        self.store.learned_answers()
    }
}

impl Resolver for LearnedAnswerStore {
    fn tier(&self) -> Tier {
        Tier::Learned
    }

    fn try_resolve(&self, message: &AnalyzedText) -> Result<Option<Match>, StoreError> {
        Ok(self.lookup(message)?.map(|scored| {
            debug!(question = %scored.answer.question, score = scored.score, "learned answer hit");
            Match {
                text: scored.answer.answer,
                score: scored.score,
                addresses_user: scored.answer.addresses_user,
            }
        }))
    }
}

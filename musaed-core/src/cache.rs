//! Read cache over the learned answers.
//!
//! Readers take a cheap `Arc` snapshot; refreshes swap the whole snapshot, so
//! a reader racing a refresh keeps serving the previous one.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::model::LearnedAnswer;

/// A learned answer with its matching keys computed once.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAnswer {
    pub answer: LearnedAnswer,
    pub normalized: String,
    pub keywords: HashSet<String>,
}

#[derive(Debug)]
struct Snapshot {
    answers: Arc<Vec<CachedAnswer>>,
    loaded_at: Instant,
}

#[derive(Debug, Default)]
pub struct LearnedAnswerCache {
    snapshot: RwLock<Option<Snapshot>>,
    ttl: Option<Duration>,
}

impl LearnedAnswerCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            snapshot: RwLock::new(None),
            ttl,
        }
    }

    /// Current snapshot, or `None` when empty, invalidated or expired.
    pub fn get(&self) -> Option<Arc<Vec<CachedAnswer>>> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        let snapshot = guard.as_ref()?;
        if let Some(ttl) = self.ttl {
            if snapshot.loaded_at.elapsed() >= ttl {
                return None;
            }
        }
        Some(Arc::clone(&snapshot.answers))
    }

    pub fn replace(&self, answers: Vec<CachedAnswer>) -> Arc<Vec<CachedAnswer>> {
        let answers = Arc::new(answers);
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Snapshot {
            answers: Arc::clone(&answers),
            loaded_at: Instant::now(),
        });
        answers
    }

    pub fn invalidate(&self) {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }
}

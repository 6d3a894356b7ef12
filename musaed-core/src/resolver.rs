use std::fmt;

use musaed_text::AnalyzedText;
use serde::Serialize;
use tracing::debug;

use crate::knowledge::KnowledgeBase;
use crate::store::StoreError;

/// A lookup stage of the resolution cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    KnowledgeBase,
    Learned,
    PendingAnswer,
    Custom(&'static str),
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::KnowledgeBase => "knowledge_base",
            Tier::Learned => "learned",
            Tier::PendingAnswer => "pending_answer",
            Tier::Custom(name) => *name,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer produced by a tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub text: String,
    pub score: f64,
    /// The text already speaks to the user by name.
    pub addresses_user: bool,
}

pub trait Resolver: Send + Sync {
    fn tier(&self) -> Tier;

    /// `Ok(None)` is a miss. Errors are read failures; the engine treats
    /// them as a miss too.
    fn try_resolve(&self, message: &AnalyzedText) -> Result<Option<Match>, StoreError>;
}

impl Resolver for KnowledgeBase {
    fn tier(&self) -> Tier {
        Tier::KnowledgeBase
    }

    fn try_resolve(&self, message: &AnalyzedText) -> Result<Option<Match>, StoreError> {
        let hit = self.find(&message.normalized, message.language);
        Ok(hit.map(|hit| {
            debug!(topic = %hit.entry.topic, keyword = hit.keyword, "knowledge base hit");
            Match {
                text: hit.response.to_string(),
                score: 1.0,
                addresses_user: hit.entry.addresses_user,
            }
        }))
    }
}

//! The resolution cascade.
//!
//! A message passes the validity gate, is analyzed once, then walks the
//! tiers in order: knowledge base, learned answers, operator-answered
//! pending questions, then any appended tiers. The first hit wins. On a miss
//! the message is filed as pending and the apology template is returned.
//! Every call writes exactly one conversation record.

use std::sync::Arc;

use chrono::Utc;
use musaed_text::{has_recognizable_char, Language, TextAnalyzer};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::cache::LearnedAnswerCache;
use crate::config::{ConfigError, EngineConfig};
use crate::knowledge::{KnowledgeBase, KnowledgeError};
use crate::learned::LearnedAnswerStore;
use crate::model::{ConversationRecord, LearnedAnswer, PendingQuestion};
use crate::pending::PendingQuestionQueue;
use crate::resolver::{Resolver, Tier};
use crate::store::{ConversationLog, QuestionStore, StoreError};
use crate::templates;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("question normalizes to nothing")]
    EmptyQuestion,

    #[error("answer must not be blank")]
    EmptyAnswer,

    #[error("every storage tier failed and the question could not be filed: {0}")]
    Unavailable(StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Answered { tier: Tier, score: f64 },
    NotFound { language: Language },
    /// The validity gate refused the message.
    Rejected,
    Failed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Answered { .. } => "answered",
            Outcome::NotFound { .. } => "not_found",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "failed",
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Outcome::Answered { tier, .. } => Some(*tier),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub outcome: Outcome,
}

pub struct ResolutionEngine {
    config: EngineConfig,
    analyzer: Arc<TextAnalyzer>,
    knowledge: Arc<KnowledgeBase>,
    learned: Arc<LearnedAnswerStore>,
    pending: Arc<PendingQuestionQueue>,
    extra: Vec<Arc<dyn Resolver>>,
    log: Arc<dyn ConversationLog>,
}

impl ResolutionEngine {
    /// Engine over the built-in catalog and the default Egyptian analyzer.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn QuestionStore>,
        log: Arc<dyn ConversationLog>,
    ) -> Result<Self, EngineError> {
        Self::with_analyzer(config, TextAnalyzer::default(), store, log)
    }

    pub fn with_analyzer(
        config: EngineConfig,
        analyzer: TextAnalyzer,
        store: Arc<dyn QuestionStore>,
        log: Arc<dyn ConversationLog>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let analyzer = Arc::new(analyzer);
        let knowledge = Arc::new(KnowledgeBase::builtin(analyzer.normalizer())?);
        let cache = Arc::new(LearnedAnswerCache::new(config.cache_ttl()));
        let learned = Arc::new(LearnedAnswerStore::new(
            Arc::clone(&store),
            Arc::clone(&analyzer),
            Arc::clone(&cache),
            config.similarity.build(),
            config.learned_threshold,
        ));
        let pending = Arc::new(PendingQuestionQueue::new(
            store,
            Arc::clone(&analyzer),
            cache,
            config.similarity.build(),
            config.pending_threshold,
        ));
        Ok(Self {
            config,
            analyzer,
            knowledge,
            learned,
            pending,
            extra: Vec::new(),
            log,
        })
    }

    /// Swap the catalog. Keywords must already be compiled with this
    /// engine's normalizer; see [`ResolutionEngine::analyzer`].
    pub fn with_knowledge_base(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = Arc::new(knowledge);
        self
    }

    /// Append a tier consulted after the built-in ones.
    pub fn push_resolver(&mut self, resolver: Arc<dyn Resolver>) {
        self.extra.push(resolver);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &TextAnalyzer {
        &self.analyzer
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn learned(&self) -> &LearnedAnswerStore {
        &self.learned
    }

    pub fn pending(&self) -> &PendingQuestionQueue {
        &self.pending
    }

    fn tiers(&self) -> impl Iterator<Item = &dyn Resolver> + '_ {
        [
            self.knowledge.as_ref() as &dyn Resolver,
            self.learned.as_ref() as &dyn Resolver,
            self.pending.as_ref() as &dyn Resolver,
        ]
        .into_iter()
        .chain(self.extra.iter().map(|tier| tier.as_ref() as &dyn Resolver))
    }

    /// Reply text only. Never fails.
    pub fn resolve(&self, user_id: &str, user_name: &str, message: &str) -> String {
        self.respond(user_id, user_name, message).text
    }

    /// Reply text plus how it was produced. Never fails; an internal error
    /// becomes the generic apology with [`Outcome::Failed`].
    pub fn respond(&self, user_id: &str, user_name: &str, message: &str) -> Reply {
        let user_id = non_blank(user_id).unwrap_or(self.config.anonymous_user_id.as_str());
        let user_name = non_blank(user_name).unwrap_or(self.config.guest_name.as_str());

        let reply = match self.try_respond(user_id, user_name, message) {
            Ok(reply) => reply,
            Err(err) => {
                error!(error = %err, user_id, "resolution failed");
                Reply {
                    text: templates::failure().to_string(),
                    outcome: Outcome::Failed,
                }
            }
        };

        self.record(user_id, user_name, message, &reply.text);
        reply
    }

    fn try_respond(
        &self,
        user_id: &str,
        user_name: &str,
        message: &str,
    ) -> Result<Reply, EngineError> {
        if !has_recognizable_char(message) {
            debug!(user_id, "message rejected by validity gate");
            return Ok(Reply {
                text: templates::invalid_input(user_name),
                outcome: Outcome::Rejected,
            });
        }

        let analyzed = self.analyzer.analyze(message);
        let mut tier_failure = None;
        for tier in self.tiers() {
            match tier.try_resolve(&analyzed) {
                Ok(Some(hit)) => {
                    let text = if hit.addresses_user {
                        hit.text
                    } else {
                        templates::personalize(analyzed.language, user_name, &hit.text)
                    };
                    return Ok(Reply {
                        text,
                        outcome: Outcome::Answered {
                            tier: tier.tier(),
                            score: hit.score,
                        },
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(tier = %tier.tier(), error = %err, "tier lookup failed, treating as miss");
                    tier_failure = Some(err);
                }
            }
        }

        if let Err(err) = self
            .pending
            .upsert_normalized(&analyzed.normalized, message, user_id)
        {
            if tier_failure.is_some() {
                return Err(EngineError::Unavailable(err));
            }
            warn!(error = %err, user_id, "could not file pending question");
        }

        Ok(Reply {
            text: templates::not_found(analyzed.language).to_string(),
            outcome: Outcome::NotFound {
                language: analyzed.language,
            },
        })
    }

    fn record(&self, user_id: &str, user_name: &str, message: &str, response: &str) {
        let record = ConversationRecord {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            message: message.to_string(),
            response: response.to_string(),
            timestamp: Utc::now(),
        };
        if let Err(err) = self.log.append(&record) {
            warn!(error = %err, user_id, "could not log conversation");
        }
    }

    // Operator surface.

    pub fn pending_questions(&self) -> Result<Vec<PendingQuestion>, EngineError> {
        Ok(self.pending.list()?)
    }

    pub fn learned_answers(&self) -> Result<Vec<LearnedAnswer>, EngineError> {
        Ok(self.learned.all()?)
    }

    pub fn answer_pending(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<PendingQuestion, EngineError> {
        if answer.trim().is_empty() {
            return Err(EngineError::EmptyAnswer);
        }
        Ok(self.pending.answer(question, answer)?)
    }

    pub fn promote(&self, question: &str) -> Result<LearnedAnswer, EngineError> {
        Ok(self.pending.promote(question)?)
    }

    pub fn discard(&self, question: &str) -> Result<bool, EngineError> {
        Ok(self.pending.discard(question)?)
    }

    pub fn teach(
        &self,
        question: &str,
        answer: &str,
        addresses_user: bool,
    ) -> Result<LearnedAnswer, EngineError> {
        if self.analyzer.normalize(question).is_empty() {
            return Err(EngineError::EmptyQuestion);
        }
        if answer.trim().is_empty() {
            return Err(EngineError::EmptyAnswer);
        }
        Ok(self.learned.teach(question, answer, addresses_user)?)
    }

    /// Reload learned answers now. Returns how many are cached.
    pub fn refresh_cache(&self) -> Result<usize, EngineError> {
        Ok(self.learned.refresh()?)
    }

    /// Drop cached learned answers; the next lookup reloads them.
    pub fn invalidate_cache(&self) {
        self.learned.invalidate();
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

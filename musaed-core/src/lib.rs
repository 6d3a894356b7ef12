//! Response resolution for the assistant: a cascade of lookup tiers over a
//! curated catalog, operator-taught answers and operator-answered pending
//! questions, with every unanswered question fed back to the operators.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod knowledge;
pub mod learned;
pub mod model;
pub mod pending;
pub mod resolver;
pub mod store;
pub mod templates;

pub use cache::{CachedAnswer, LearnedAnswerCache};
pub use config::{ConfigError, EngineConfig, CONFIG_ENV};
pub use engine::{EngineError, Outcome, Reply, ResolutionEngine};
pub use knowledge::{KnowledgeBase, KnowledgeEntry, KnowledgeError, KnowledgeMatch};
pub use learned::{LearnedAnswerStore, ScoredAnswer};
pub use model::{ConversationRecord, LearnedAnswer, PendingQuestion};
pub use pending::PendingQuestionQueue;
pub use resolver::{Match, Resolver, Tier};
pub use store::{ConversationLog, MemoryStore, QuestionCatalog, QuestionStore, StoreError};

pub use musaed_text::{AnalyzedText, Language, TextAnalyzer, TextNormalizer};

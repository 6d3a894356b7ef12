use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator-curated answer keyed by the normalized question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearnedAnswer {
    pub question: String,
    pub answer: String,
    pub learned_at: DateTime<Utc>,
    /// The answer already speaks to the user by name, so no greeting is
    /// prepended.
    #[serde(default)]
    pub addresses_user: bool,
}

/// A question nobody could answer yet, keyed by its normalized form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingQuestion {
    pub question: String,
    /// Latest raw wording, kept for operator context.
    #[serde(default)]
    pub original: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub admin_response: Option<String>,
}

impl PendingQuestion {
    pub fn answer(&self) -> Option<&str> {
        self.admin_response
            .as_deref()
            .map(str::trim)
            .filter(|answer| !answer.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    pub user_id: String,
    pub user_name: String,
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

//! Audit events for chat messages that ask for contact details.

use musaed_core::TextNormalizer;
use tracing::info;

pub const AUDIT_TARGET: &str = "musaed::audit";

pub static CONTACT_TRIGGERS: &[&str] = &[
    "تواصل", "أكلم حد", "رقم", "اتصل", "contact", "call", "phone",
];

#[derive(Debug, Clone)]
pub struct ContactRequestDetector {
    triggers: Vec<String>,
}

impl ContactRequestDetector {
    pub fn new(normalizer: &TextNormalizer) -> Self {
        let triggers = CONTACT_TRIGGERS
            .iter()
            .map(|trigger| normalizer.normalize(trigger))
            .filter(|trigger| !trigger.is_empty())
            .collect();
        Self { triggers }
    }

    /// Substring test against an already normalized message.
    pub fn is_contact_request(&self, normalized: &str) -> bool {
        self.triggers
            .iter()
            .any(|trigger| normalized.contains(trigger.as_str()))
    }
}

pub fn record_contact_request(user_id: &str, user_name: &str, message: &str) {
    info!(
        target: AUDIT_TARGET,
        event = "contact_info_requested",
        user_id,
        user_name,
        chat_message = message,
        "user requested contact details"
    );
}

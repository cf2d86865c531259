//! Cache key derivation
//!
//! Keys depend only on the normalized question and the canonical filter
//! serialization, so identical questions under identical filters collide.

use crate::types::FilterSet;

/// Prefix of final-answer entries
pub const ANSWER_NAMESPACE: &str = "answer:";

/// Prefix of question-embedding entries
pub const EMBED_NAMESPACE: &str = "embed:";

/// Every namespace this service writes
pub const NAMESPACES: [&str; 2] = [ANSWER_NAMESPACE, EMBED_NAMESPACE];

/// Trim and lower-case a question
pub fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase()
}

/// `answer:<question>:<filters>`
pub fn answer_key(question: &str, filters: &FilterSet) -> String {
    format!(
        "{}{}:{}",
        ANSWER_NAMESPACE,
        normalize_question(question),
        filters.canonical()
    )
}

/// `embed:<question>`; the question vector does not depend on filters
pub fn embed_key(question: &str) -> String {
    format!("{}{}", EMBED_NAMESPACE, normalize_question(question))
}

//! Prompt construction and re-rank output handling

pub mod prompt;
pub mod rerank;

pub use prompt::{Persona, PromptBuilder};
pub use rerank::{fallback_ranking, parse_reranked};

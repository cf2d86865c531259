//! Retrieval helpers: cache keys, lexical boost and candidate selection

pub mod hybrid;
pub mod keys;

pub use hybrid::{apply_keyword_boost, question_terms, select_candidates};
pub use keys::{answer_key, embed_key, normalize_question};

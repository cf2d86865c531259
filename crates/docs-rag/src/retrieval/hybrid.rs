//! Lexical overlap boost and candidate selection over vector hits

use crate::types::SearchHit;

/// Distinct lower-cased whitespace tokens of the question, in first-seen order
pub fn question_terms(question: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in question.split_whitespace() {
        let token = token.to_lowercase();
        if !terms.contains(&token) {
            terms.push(token);
        }
    }
    terms
}

/// Add `boost` per question term contained in each hit's chunk, then re-sort
///
/// Matching is a case-insensitive substring test. The sort is stable, so
/// hits with equal boosted scores keep their search order.
pub fn apply_keyword_boost(hits: &mut [SearchHit], question: &str, boost: f32) {
    let terms = question_terms(question);
    if terms.is_empty() {
        return;
    }

    for hit in hits.iter_mut() {
        let text = hit.payload.chunk.to_lowercase();
        let matched = terms.iter().filter(|term| text.contains(term.as_str())).count();
        hit.score += boost * matched as f32;
    }

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Drop hits under `min_score` and keep at most `max_candidates`
pub fn select_candidates(hits: Vec<SearchHit>, min_score: f32, max_candidates: usize) -> Vec<SearchHit> {
    hits.into_iter()
        .filter(|hit| hit.score >= min_score)
        .take(max_candidates)
        .collect()
}

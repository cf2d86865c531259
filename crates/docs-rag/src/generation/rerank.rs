//! Parsing of model re-rank output, with a deterministic fallback

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{RankedChunk, SearchHit};

/// Parse the model's re-rank answer into at most `limit` candidates
///
/// Accepts a JSON array of `{"chunk", "score"}` objects, bare strings or
/// 1-based snippet numbers, optionally wrapped in a Markdown code fence.
/// Every entry must resolve to one of `candidates`, either by its exact text
/// or by the `[n]` label the re-rank prompt gives it. Entries that resolve to
/// nothing or repeat an earlier pick are dropped, and the returned text is
/// always the candidate's own. Entries without a score keep the candidate's
/// retrieval score.
pub fn parse_reranked(raw: &str, candidates: &[SearchHit], limit: usize) -> Result<Vec<RankedChunk>> {
    let value: Value = serde_json::from_str(strip_fences(raw))
        .map_err(|e| Error::parse(format!("re-rank output is not JSON: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(Error::parse("re-rank output is not a JSON array"));
    };

    let mut picked = vec![false; candidates.len()];
    let mut ranked = Vec::with_capacity(items.len().min(limit));
    for item in items {
        let (position, score) = match &item {
            Value::String(chunk) => (resolve_text(chunk, candidates), None),
            Value::Number(n) => (n.as_u64().and_then(|n| resolve_label(n, candidates)), None),
            Value::Object(fields) => {
                let Some(Value::String(chunk)) = fields.get("chunk") else {
                    return Err(Error::parse("re-rank entry has no \"chunk\" string"));
                };
                let score = fields.get("score").and_then(Value::as_f64).map(|s| s as f32);
                (resolve_text(chunk, candidates), score)
            }
            other => {
                return Err(Error::parse(format!("unexpected re-rank entry: {}", other)));
            }
        };

        let Some(position) = position else {
            tracing::debug!("Dropping re-rank entry that matches no candidate: {}", item);
            continue;
        };
        if std::mem::replace(&mut picked[position], true) {
            continue;
        }

        let hit = &candidates[position];
        ranked.push(RankedChunk {
            chunk: hit.payload.chunk.clone(),
            score: score.unwrap_or(hit.score),
        });
        if ranked.len() == limit {
            break;
        }
    }

    if ranked.is_empty() {
        return Err(Error::parse("re-rank output selected no retrieved chunk"));
    }
    Ok(ranked)
}

/// Candidate position for an entry given as snippet text, optionally
/// prefixed with its `[n]` label
fn resolve_text(text: &str, candidates: &[SearchHit]) -> Option<usize> {
    let text = text.trim();
    if let Some(position) = candidates.iter().position(|hit| hit.payload.chunk.trim() == text) {
        return Some(position);
    }

    let (label, rest) = text.strip_prefix('[')?.split_once(']')?;
    let position = resolve_label(label.trim().parse().ok()?, candidates)?;
    let rest = rest.trim();
    (rest.is_empty() || rest == candidates[position].payload.chunk.trim()).then_some(position)
}

/// Candidate position for a 1-based snippet label
fn resolve_label(label: u64, candidates: &[SearchHit]) -> Option<usize> {
    let position = usize::try_from(label).ok()?.checked_sub(1)?;
    (position < candidates.len()).then_some(position)
}

/// Top `limit` candidates by their existing score order
pub fn fallback_ranking(candidates: &[SearchHit], limit: usize) -> Vec<RankedChunk> {
    candidates
        .iter()
        .take(limit)
        .map(|hit| RankedChunk {
            chunk: hit.payload.chunk.clone(),
            score: hit.score,
        })
        .collect()
}

/// Remove a surrounding ``` or ```json fence
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the info string (e.g. "json") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, PointPayload};
    use serde_json::Map;

    fn hits() -> Vec<SearchHit> {
        ["Alpha.", "Beta.", "Gamma."]
            .iter()
            .enumerate()
            .map(|(i, text)| SearchHit {
                payload: PointPayload::from_chunk(&Chunk::new(*text, i, "a.pdf"), &Map::new()),
                score: 0.9 - i as f32 * 0.1,
            })
            .collect()
    }

    #[test]
    fn test_parse_objects() {
        let raw = r#"[{"chunk": "Gamma.", "score": 0.95}, {"chunk": "Alpha.", "score": 0.5}]"#;
        let ranked = parse_reranked(raw, &hits(), 5).unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk, "Gamma.");
        assert!((ranked[0].score - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_parse_fenced_strings_truncated() {
        let raw = "```json\n[\"Beta.\", \"Alpha.\", \"Gamma.\"]\n```";
        let ranked = parse_reranked(raw, &hits(), 2).unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk, "Beta.");
        assert!((ranked[0].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_parse_rejects_text_that_was_not_retrieved() {
        let raw = r#"[{"chunk": "The refund window is 400 days.", "score": 1.0}]"#;
        assert!(matches!(parse_reranked(raw, &hits(), 3), Err(Error::Parse(_))));

        let raw = r#"[{"chunk": "The refund window is 400 days.", "score": 1.0}, {"chunk": "Beta.", "score": 0.4}]"#;
        let ranked = parse_reranked(raw, &hits(), 3).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].chunk, "Beta.");
    }

    #[test]
    fn test_parse_labels_and_duplicates() {
        let raw = r#"["[3]", {"chunk": "[1] Alpha.", "score": 0.7}, "Gamma.", 2, 9]"#;
        let ranked = parse_reranked(raw, &hits(), 5).unwrap();

        let chunks: Vec<&str> = ranked.iter().map(|r| r.chunk.as_str()).collect();
        assert_eq!(chunks, ["Gamma.", "Alpha.", "Beta."]);
        assert!((ranked[0].score - 0.7).abs() < 1e-6);
        assert!((ranked[1].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_parse_label_with_altered_text_is_dropped() {
        let raw = r#"["[2] Beta, and the refund window is 400 days."]"#;
        assert!(parse_reranked(raw, &hits(), 3).is_err());
    }

    #[test]
    fn test_parse_failures() {
        let candidates = hits();
        for raw in [
            "Here are the best snippets: Alpha.",
            r#"{"chunk": "Alpha."}"#,
            "[]",
            r#"[{"score": 1.0}]"#,
            "[42]",
            crate::providers::GENERATION_FAILED,
        ] {
            assert!(
                matches!(parse_reranked(raw, &candidates, 3), Err(Error::Parse(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn test_fallback_ranking() {
        let ranked = fallback_ranking(&hits(), 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk, "Alpha.");
        assert_eq!(ranked[1].chunk, "Beta.");
        assert!(fallback_ranking(&hits(), 10).len() == 3);
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_fences("  [1] "), "[1]");
    }
}

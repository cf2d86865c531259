//! Sentence-aware text segmentation with token-budgeted overlap
//!
//! Token counts are approximated as `ceil(chars / 4)`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Chunk;

/// Sentence terminator followed by whitespace
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.?!]\s+").expect("valid regex"));

/// Clause separator followed by whitespace; "1,000" and "a,b" are not breaks
static CLAUSE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;]\s+").expect("valid regex"));

/// Approximate token count of a string
pub fn approximate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Splits text into bounded, overlapping chunks
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    /// Token budget per chunk
    max_tokens: usize,
    /// Token budget for units carried into the next chunk
    overlap_tokens: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(200, 30)
    }
}

/// A packed chunk before it is turned into text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Packed {
    units: Vec<String>,
    /// Leading units repeated from the previous chunk
    carried: usize,
}

impl Segmenter {
    /// Create a segmenter
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            max_tokens,
            overlap_tokens,
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Segment `text` into chunks attributed to `source_id`
    pub fn segment(&self, text: &str, source_id: &str) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk::new(text, index, source_id))
            .collect()
    }

    /// Segment `text` into chunk texts
    pub fn split(&self, text: &str) -> Vec<String> {
        self.pack(&self.units(text))
            .into_iter()
            .map(|packed| packed.units.join(" "))
            .collect()
    }

    /// Sentence units, with oversized sentences broken on clause boundaries
    fn units(&self, text: &str) -> Vec<String> {
        let mut units = Vec::new();
        for sentence in split_sentences(text) {
            if approximate_tokens(sentence) > self.max_tokens {
                units.extend(self.split_clauses(sentence));
            } else {
                units.push(sentence.to_string());
            }
        }
        units
    }

    /// Greedily regroup comma/semicolon pieces into sub-units within budget
    ///
    /// Sub-units are slices of `sentence`, so the text inside them is kept
    /// byte for byte. A single piece longer than the budget is kept whole.
    fn split_clauses(&self, sentence: &str) -> Vec<String> {
        let mut bounds: Vec<usize> = CLAUSE_BREAK.find_iter(sentence).map(|m| m.end()).collect();
        bounds.push(sentence.len());

        let mut sub_units = Vec::new();
        let (mut start, mut end) = (0usize, 0usize);
        for bound in bounds {
            if end > start && approximate_tokens(sentence[start..bound].trim()) > self.max_tokens {
                sub_units.push(sentence[start..end].trim().to_string());
                start = end;
            }
            end = bound;
        }

        let rest = sentence[start..end].trim();
        if !rest.is_empty() {
            sub_units.push(rest.to_string());
        }
        sub_units
    }

    /// Pack units into chunks, seeding each new chunk with a suffix of the last one
    fn pack(&self, units: &[String]) -> Vec<Packed> {
        let mut chunks = Vec::new();
        let mut buffer: Vec<(&str, usize)> = Vec::new();
        let mut carried = 0usize;
        let mut current_tokens = 0usize;

        for unit in units {
            let unit_tokens = approximate_tokens(unit);

            if current_tokens + unit_tokens > self.max_tokens && !buffer.is_empty() {
                chunks.push(Packed {
                    units: buffer.iter().map(|(u, _)| u.to_string()).collect(),
                    carried,
                });

                // Walk back from the end while the suffix fits the overlap budget
                // and still leaves room for the unit that closed the chunk
                let mut overlap_tokens = 0usize;
                let mut keep_from = buffer.len();
                for (i, (_, tokens)) in buffer.iter().enumerate().rev() {
                    let carried_tokens = overlap_tokens + tokens;
                    if carried_tokens <= self.overlap_tokens
                        && carried_tokens + unit_tokens <= self.max_tokens
                    {
                        overlap_tokens += tokens;
                        keep_from = i;
                    } else {
                        break;
                    }
                }

                buffer.drain(..keep_from);
                carried = buffer.len();
                current_tokens = overlap_tokens;
            }

            buffer.push((unit.as_str(), unit_tokens));
            current_tokens += unit_tokens;
        }

        if !buffer.is_empty() {
            chunks.push(Packed {
                units: buffer.iter().map(|(u, _)| u.to_string()).collect(),
                carried,
            });
        }

        chunks
    }
}

/// Split after every sentence terminator that is followed by whitespace
fn split_sentences(text: &str) -> Vec<&str> {
    split_after(&SENTENCE_BREAK, text)
}

/// Split on `pattern`, keeping its first character with the left piece and
/// dropping the rest of the match. Pieces are trimmed; empty pieces dropped.
fn split_after<'a>(pattern: &Regex, text: &'a str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0usize;

    for m in pattern.find_iter(text) {
        // Terminators are ASCII, so one byte
        let end = m.start() + 1;
        pieces.push(&text[start..end]);
        start = m.end();
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

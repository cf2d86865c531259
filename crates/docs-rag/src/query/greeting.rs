//! Greeting detection for the persona pipeline

use crate::config::GreetingMatch;

/// Recognises short greetings that carry nothing to retrieve
#[derive(Debug, Clone)]
pub struct GreetingDetector {
    /// Keywords as word sequences
    keywords: Vec<Vec<String>>,
    /// Longer questions are never treated as greetings
    max_words: usize,
    matching: GreetingMatch,
}

/// Lower-cased words, apostrophes kept so "what's" stays one word
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

impl GreetingDetector {
    pub fn new<S: AsRef<str>>(keywords: &[S], max_words: usize) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| words(k.as_ref()))
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            keywords,
            max_words,
            matching: GreetingMatch::default(),
        }
    }

    /// Select the keyword matching rule
    pub fn with_matching(mut self, matching: GreetingMatch) -> Self {
        self.matching = matching;
        self
    }

    /// Whether `question` is a greeting
    ///
    /// With [`GreetingMatch::Word`] (the default) keywords match whole words
    /// or contiguous word runs, so "hi" matches "Hi there" but neither "this"
    /// nor "hiii". This is stricter than a substring test, which would route
    /// "Which chapter covers shipping?" to the greeting path.
    /// [`GreetingMatch::Substring`] restores the plain containment test.
    pub fn is_greeting(&self, question: &str) -> bool {
        if question.split_whitespace().count() > self.max_words {
            return false;
        }

        let words = words(question);
        match self.matching {
            GreetingMatch::Word => self
                .keywords
                .iter()
                .any(|keyword| words.windows(keyword.len()).any(|window| window == keyword.as_slice())),
            GreetingMatch::Substring => {
                let normalized = words.join(" ");
                self.keywords
                    .iter()
                    .any(|keyword| normalized.contains(keyword.join(" ").as_str()))
            }
        }
    }
}

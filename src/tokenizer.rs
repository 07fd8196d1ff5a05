//! Tokenizer boundary
//!
//! The aggregator treats segmentation as a black box: raw text in, an
//! ordered list of terms out. `SimpleTokenizer` is the built-in
//! implementation; any `Fn(&str) -> Vec<String>` also works.
//!
//! Text is lowercased and split on anything that is not alphanumeric.
//! CJK ideographs carry no word boundaries, so each one becomes its own
//! term. Stop words are dropped.

use std::collections::HashSet;
use std::path::Path;

use crate::window::{AggregatorError, AggregatorResult};

/// File inside a dictionary directory holding extra stop words
pub const STOP_WORDS_FILE: &str = "stop_words.txt";

const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "was", "were", "this",
    "that", "with", "from", "have", "has", "had", "its", "into", "than", "then", "they", "them",
    "their", "there", "what", "when", "where", "which", "who", "will", "would", "could", "should",
    "about", "also", "just", "very", "some", "such", "our", "out", "his", "her", "she", "him",
    "been", "being", "does", "did", "how", "why", "each", "more", "most", "other", "only", "own",
    "same", "too", "your", "yours", "these", "those", "over", "under", "again", "here",
];

/// Splits raw message text into terms
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn tokenize(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// Lowercasing, stop-word-filtering tokenizer
#[derive(Debug, Clone)]
pub struct SimpleTokenizer {
    stop_words: HashSet<String>,
}

impl Default for SimpleTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleTokenizer {
    /// Tokenizer with the built-in stop word list
    pub fn new() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Tokenizer with no stop words at all
    pub fn without_stop_words() -> Self {
        Self {
            stop_words: HashSet::new(),
        }
    }

    /// Load tokenizer resources from a dictionary directory
    ///
    /// The directory must exist. If it contains `stop_words.txt`, each
    /// non-empty line not starting with `#` is added to the built-in list.
    pub fn from_dir(dir: &Path) -> AggregatorResult<Self> {
        if !dir.is_dir() {
            return Err(AggregatorError::TokenizerResources {
                path: dir.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut tokenizer = Self::new();
        let path = dir.join(STOP_WORDS_FILE);
        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                AggregatorError::TokenizerResources {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            let before = tokenizer.stop_words.len();
            tokenizer.extend_stop_words(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#')),
            );
            tracing::info!(
                path = ?path,
                added = tokenizer.stop_words.len() - before,
                "Loaded stop words"
            );
        }

        Ok(tokenizer)
    }

    /// Add stop words (lowercased)
    pub fn extend_stop_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words
            .extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    fn flush(&self, tokens: &mut Vec<String>, word: &mut String) {
        if !word.is_empty() {
            if !self.stop_words.contains(word.as_str()) {
                tokens.push(std::mem::take(word));
            } else {
                word.clear();
            }
        }
    }
}

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut word = String::new();

        for c in text.chars().flat_map(char::to_lowercase) {
            if is_cjk(c) {
                self.flush(&mut tokens, &mut word);
                word.push(c);
                self.flush(&mut tokens, &mut word);
            } else if c.is_alphanumeric() {
                word.push(c);
            } else {
                self.flush(&mut tokens, &mut word);
            }
        }
        self.flush(&mut tokens, &mut word);

        tokens
    }
}

/// CJK unified ideographs and the common extension blocks
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

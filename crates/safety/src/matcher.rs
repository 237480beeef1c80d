//! Keyword matching seam.
//!
//! Routing logic only asks "does this text hit any keyword in this set?".
//! [`SubstringMatcher`] answers by raw containment, so `"hi"` also fires on
//! `"this"`. [`TokenMatcher`] requires the keyword to sit on word boundaries.

use std::fmt;

/// A named, normalized, read-only keyword list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    name: String,
    words: Vec<String>,
}

impl KeywordSet {
    /// Build a set, lowercasing and trimming every entry and dropping blanks.
    pub fn new<I, S>(name: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

/// Lowercase and trim a message before matching.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Strategy for testing normalized text against a keyword set.
///
/// `text` is expected to be already [`normalize`]d.
pub trait KeywordMatcher: Send + Sync + fmt::Debug {
    /// The first keyword of `set` (in declared order) found in `text`.
    fn find<'a>(&self, text: &str, set: &'a KeywordSet) -> Option<&'a str>;

    /// Whether any keyword of `set` is found in `text`.
    fn matches(&self, text: &str, set: &KeywordSet) -> bool {
        self.find(text, set).is_some()
    }
}

/// Plain substring containment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl KeywordMatcher for SubstringMatcher {
    fn find<'a>(&self, text: &str, set: &'a KeywordSet) -> Option<&'a str> {
        set.words
            .iter()
            .find(|w| text.contains(w.as_str()))
            .map(String::as_str)
    }
}

/// Keyword must be delimited by non-alphanumeric characters (or text edges).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMatcher;

impl TokenMatcher {
    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    fn occurs_as_token(text: &str, word: &str) -> bool {
        text.match_indices(word).any(|(start, _)| {
            let end = start + word.len();
            let before = text[..start].chars().next_back();
            let after = text[end..].chars().next();
            !before.is_some_and(Self::is_word_char) && !after.is_some_and(Self::is_word_char)
        })
    }
}

impl KeywordMatcher for TokenMatcher {
    fn find<'a>(&self, text: &str, set: &'a KeywordSet) -> Option<&'a str> {
        set.words
            .iter()
            .find(|w| Self::occurs_as_token(text, w))
            .map(String::as_str)
    }
}

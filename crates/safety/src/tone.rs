//! House-style vocabulary rewriting.
//!
//! Rules are whole-word, case-insensitive and applied in declared order.
//! Later rules see the output of earlier ones, so the order is part of the
//! behavior: "friend" becomes "battle buddy" and the following "buddy" rule
//! turns that into "battle battle buddy".

use crate::error::SafetyError;
use regex_lite::{NoExpand, Regex};

/// Generic term and its replacement, in application order.
const STANDARD_RULES: &[(&str, &str)] = &[
    ("friend", "battle buddy"),
    ("buddy", "battle buddy"),
    ("person", "warrior"),
    ("people", "warriors"),
    ("guys", "troops"),
    ("everyone", "all hands"),
    ("understand", "copy that"),
    ("got it", "roger that"),
    ("okay", "roger"),
    ("alright", "solid copy"),
    ("good job", "outstanding"),
    ("well done", "mission accomplished"),
];

#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    replacement: String,
}

#[derive(Debug, Clone)]
pub struct ToneNormalizer {
    rules: Vec<Rule>,
}

impl ToneNormalizer {
    /// The built-in battle-buddy dictionary.
    pub fn standard() -> Result<Self, SafetyError> {
        Self::from_pairs(STANDARD_RULES.iter().copied())
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, SafetyError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let rules = pairs
            .into_iter()
            .map(|(word, replacement)| {
                let source = format!(r"(?i)\b{}\b", regex_lite::escape(word));
                let pattern = Regex::new(&source).map_err(|e| SafetyError::InvalidPattern {
                    pattern: word.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Rule {
                    pattern,
                    replacement: replacement.to_string(),
                })
            })
            .collect::<Result<Vec<_>, SafetyError>>()?;

        Ok(Self { rules })
    }

    pub fn enhance(&self, response: &str) -> String {
        self.rules.iter().fold(response.to_string(), |text, rule| {
            rule.pattern
                .replace_all(&text, NoExpand(&rule.replacement))
                .into_owned()
        })
    }

    /// Missing input is treated as empty text.
    pub fn enhance_opt(&self, response: Option<&str>) -> String {
        self.enhance(response.unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone() -> ToneNormalizer {
        ToneNormalizer::standard().unwrap()
    }

    #[test]
    fn earlier_rules_feed_later_ones() {
        assert_eq!(tone().enhance("Hey friend"), "Hey battle battle buddy");
        assert_eq!(tone().enhance("hi buddy"), "hi battle buddy");
    }

    #[test]
    fn whole_words_only() {
        assert_eq!(tone().enhance("friends and personnel"), "friends and personnel");
    }

    #[test]
    fn case_insensitive_match() {
        assert_eq!(tone().enhance("OKAY, I Understand."), "roger, I copy that.");
    }

    #[test]
    fn phrases_are_rewritten() {
        assert_eq!(
            tone().enhance("Good job, everyone. Well done!"),
            "outstanding, all hands. mission accomplished!"
        );
        assert_eq!(tone().enhance("got it, guys"), "roger that, troops");
    }

    #[test]
    fn people_and_person() {
        assert_eq!(
            tone().enhance("One person helps other people"),
            "One warrior helps other warriors"
        );
    }

    #[test]
    fn deterministic() {
        let t = tone();
        let input = "Alright friend, I understand. Okay?";
        assert_eq!(t.enhance(input), t.enhance(input));
        assert_eq!(
            t.enhance(input),
            "solid copy battle battle buddy, I copy that. roger?"
        );
    }

    #[test]
    fn missing_input_is_empty() {
        assert_eq!(tone().enhance_opt(None), "");
        assert_eq!(tone().enhance_opt(Some("okay")), "roger");
    }

    #[test]
    fn replacement_text_is_literal() {
        let t = ToneNormalizer::from_pairs([("cash", "$1 bills")]).unwrap();
        assert_eq!(t.enhance("cash only"), "$1 bills only");
    }

    #[test]
    fn standard_has_twelve_rules() {
        assert_eq!(tone().len(), 12);
    }
}

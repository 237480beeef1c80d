//! Candidate reply validation.
//!
//! A reply fails when it is blank or contains any phrase from two fixed
//! blacklists: inappropriate advice and off-topic content. Pure,
//! case-insensitive substring scan.

use serde::Serialize;

const INAPPROPRIATE_ADVICE: &[&str] = &[
    "medical advice",
    "diagnosis",
    "prescription",
    "medication dosage",
    "legal advice",
    "financial advice",
    "investment advice",
    "political opinion",
    "religious doctrine",
    "controversial topic",
];

const OFF_TOPIC_CONTENT: &[&str] = &[
    "weather forecast",
    "stock market",
    "recipe",
    "movie review",
    "sports score",
    "political candidate",
    "cryptocurrency price",
    "shopping recommendation",
    "travel destination",
];

/// Why a reply was accepted or rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "marker", rename_all = "snake_case")]
pub enum Validation {
    Valid,
    Empty,
    InappropriateAdvice(String),
    OffTopicContent(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, response: &str) -> bool {
        self.check(response).is_valid()
    }

    /// Full verdict, naming the first marker that matched.
    pub fn check(&self, response: &str) -> Validation {
        if response.trim().is_empty() {
            return Validation::Empty;
        }

        let text = response.to_lowercase();

        if let Some(marker) = first_hit(&text, INAPPROPRIATE_ADVICE) {
            return Validation::InappropriateAdvice(marker.to_string());
        }
        if let Some(marker) = first_hit(&text, OFF_TOPIC_CONTENT) {
            return Validation::OffTopicContent(marker.to_string());
        }

        Validation::Valid
    }
}

fn first_hit<'a>(text: &str, markers: &[&'a str]) -> Option<&'a str> {
    markers.iter().copied().find(|m| text.contains(m))
}

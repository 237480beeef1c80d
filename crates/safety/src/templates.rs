//! Canned reply templates.
//!
//! Selection is uniform over the category's list, through an injectable RNG
//! so tests can pin the choice with a seeded `StdRng`.

use bravomind_config::TemplateConfig;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Returned when a category is unknown or has no entries.
pub const DEFAULT_SUPPORT_MESSAGE: &str =
    "I'm here to support you, battle buddy. How can I help you today?";

/// Random source shared by template, greeting and default-reply selection.
pub type BoxedRng = Box<dyn RngCore + Send>;

/// A fresh OS-seeded generator.
pub fn os_rng() -> BoxedRng {
    Box::new(StdRng::from_os_rng())
}

/// Uniformly pick one entry from `items` using `rng`.
pub(crate) fn pick<'a, S: AsRef<str>>(rng: &Mutex<BoxedRng>, items: &'a [S]) -> Option<&'a str> {
    match items {
        [] => return None,
        [only] => return Some(only.as_ref()),
        _ => {}
    }
    let mut rng = rng.lock().unwrap_or_else(|e| e.into_inner());
    let idx = rng.random_range(0..items.len());
    Some(items[idx].as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    OffTopic,
    Crisis,
    Encouragement,
}

impl TemplateCategory {
    /// Parse a category name; accepts `off_topic`, `offTopic` and `off-topic`.
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "offtopic" => Some(Self::OffTopic),
            "crisis" => Some(Self::Crisis),
            "encouragement" => Some(Self::Encouragement),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OffTopic => "off_topic",
            Self::Crisis => "crisis",
            Self::Encouragement => "encouragement",
        };
        f.write_str(s)
    }
}

pub struct TemplateSelector {
    templates: TemplateConfig,
    rng: Mutex<BoxedRng>,
}

impl fmt::Debug for TemplateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSelector")
            .field("off_topic", &self.templates.off_topic.len())
            .field("crisis", &self.templates.crisis.len())
            .field("encouragement", &self.templates.encouragement.len())
            .finish()
    }
}

impl TemplateSelector {
    pub fn new(templates: TemplateConfig) -> Self {
        Self::with_rng(templates, os_rng())
    }

    pub fn with_rng(templates: TemplateConfig, rng: BoxedRng) -> Self {
        Self {
            templates,
            rng: Mutex::new(rng),
        }
    }

    pub fn candidates(&self, category: TemplateCategory) -> &[String] {
        match category {
            TemplateCategory::OffTopic => &self.templates.off_topic,
            TemplateCategory::Crisis => &self.templates.crisis,
            TemplateCategory::Encouragement => &self.templates.encouragement,
        }
    }

    pub fn select(&self, category: TemplateCategory) -> String {
        pick(&self.rng, self.candidates(category))
            .unwrap_or(DEFAULT_SUPPORT_MESSAGE)
            .to_string()
    }

    /// Select by category name; unknown names get the default message.
    pub fn select_named(&self, name: &str) -> String {
        match TemplateCategory::from_name(name) {
            Some(category) => self.select(category),
            None => DEFAULT_SUPPORT_MESSAGE.to_string(),
        }
    }
}

//! Errors raised while building the pipeline from configuration.
//!
//! Classification itself never fails; these only surface at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("Invalid tone pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Keyword set '{0}' is empty")]
    EmptyKeywordSet(String),
}

impl From<SafetyError> for bravomind_core::Error {
    fn from(e: SafetyError) -> Self {
        bravomind_core::Error::Pipeline {
            message: e.to_string(),
        }
    }
}

//! External text-generator clients for Bravo Mind.
//!
//! All providers implement the `bravomind_core::Provider` trait.
//! [`router::build_from_config`] builds the configured one.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;

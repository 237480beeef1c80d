//! # Bravo Mind Core
//!
//! Domain types, traits, and error definitions shared by every Bravo Mind crate.
//! This crate has **no framework dependencies**: it defines the conversation
//! model and the generator contract that the provider and pipeline crates
//! implement against.
//!
//! ## Layout
//!
//! - [`message`]: messages, roles, and in-memory conversations
//! - [`provider`]: the external text-generator contract
//! - [`error`]: the top-level error type and the generator error taxonomy

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};

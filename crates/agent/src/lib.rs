//! Turn orchestration for Bravo Mind.
//!
//! A turn moves through these stages:
//!
//! 1. **Gate** the user message (scope + crisis) through the safety pipeline
//! 2. **Admit** it through the sliding-window rate limiter
//! 3. **Generate** one candidate reply from the configured provider
//! 4. **Route** the candidate (or a fallback) back through the pipeline
//!
//! Nothing here returns an error to the caller: every failure becomes a
//! displayable reply tagged with its [`ResponseSource`].

pub mod context;
pub mod turn;

pub use context::{BRAVO_MIND_PREAMBLE, build_messages, system_prompt};
pub use turn::{
    AT_CAPACITY_MESSAGE, AUTH_FAILURE_MESSAGE, RATE_LIMITED_MESSAGE, ResponseSource,
    TurnOrchestrator, TurnOutcome,
};

//! Agent runtime - the conversational brain of bento.
//!
//! This crate turns inbound messaging events into restaurant
//! recommendations:
//! - **Intent Resolution** (`intent`) - first-turn AI classification with a
//!   deterministic fallback, then rule-based routing
//! - **Suggestion Generation** (`suggestion`) - never-throwing text
//!   generation, per-restaurant descriptions, preference analysis
//! - **Candidate Selection** (`pipeline`) - nearby search, walking-band or
//!   rating policy, detail and description enrichment
//! - **Orchestration** (`runtime`) - the conversation state machine driver
//!
//! # Safety Principle
//!
//! The LLM only classifies and writes copy. Which restaurants are shown, in
//! what order, and when the search runs are deterministic decisions made by
//! `bento-core`.

pub mod intent;
pub mod llm;
pub mod pipeline;
pub mod runtime;
pub mod suggestion;

pub use intent::IntentResolver;
pub use llm::{LlmClient, OpenAiChatClient, ScriptedLlmClient};
pub use pipeline::CandidateSelector;
pub use runtime::ConversationRuntime;
pub use suggestion::{InitialIntent, InitialIntentKind, PreferenceAnalysis, SuggestionClient};

//! Chatogram Engine - matchmaking and session engine for the Chatogram
//! anonymous chat platform.
//!
//! This library pairs concurrent users into 1:1 relay sessions, biases
//! pairing by reputation and attribute filters, and feeds session outcomes
//! (skips, reports, blocks) back into future pairing eligibility.

pub mod config;
pub mod core;
pub mod engine;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use engine::{Engine, EngineError, EnginePolicy, RelayOutcome, SearchOutcome};
pub use models::{MessagePayload, NotifyEvent, PartnerSnippet, SearchMode, UserId, UserProfile};
pub use services::{Notifier, ProfileStore};

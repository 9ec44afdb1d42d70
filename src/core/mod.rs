// Core matching logic exports
pub mod eligibility;
pub mod matchmaker;
pub mod queue;
pub mod reputation;

pub use eligibility::is_eligible;
pub use matchmaker::{choose_partner, Candidate, SelectionPolicy};
pub use queue::{WaitingEntry, WaitingQueue};
pub use reputation::{
    decay_step, record_skip, session_end_deltas, ReputationPolicy, ReputationWeights,
    SessionEndDeltas,
};

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Deserialize;

/// Reputation score deltas applied by session outcomes.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReputationWeights {
    #[serde(default = "default_meaningful_session")]
    pub meaningful_session: i32,
    #[serde(default = "default_short_session_penalty")]
    pub short_session_penalty: i32,
    #[serde(default = "default_premium_loyalty_bonus")]
    pub premium_loyalty_bonus: i32,
    #[serde(default = "default_skipped_reward")]
    pub skipped_reward: i32,
    #[serde(default = "default_rapid_skip_penalty")]
    pub rapid_skip_penalty: i32,
    #[serde(default = "default_report_penalty")]
    pub report_penalty: i32,
    #[serde(default = "default_block_penalty")]
    pub block_penalty: i32,
    #[serde(default = "default_reconnect_bonus")]
    pub reconnect_bonus: i32,
}

impl Default for ReputationWeights {
    fn default() -> Self {
        Self {
            meaningful_session: default_meaningful_session(),
            short_session_penalty: default_short_session_penalty(),
            premium_loyalty_bonus: default_premium_loyalty_bonus(),
            skipped_reward: default_skipped_reward(),
            rapid_skip_penalty: default_rapid_skip_penalty(),
            report_penalty: default_report_penalty(),
            block_penalty: default_block_penalty(),
            reconnect_bonus: default_reconnect_bonus(),
        }
    }
}

fn default_meaningful_session() -> i32 { 1 }
fn default_short_session_penalty() -> i32 { -1 }
fn default_premium_loyalty_bonus() -> i32 { 2 }
fn default_skipped_reward() -> i32 { 1 }
fn default_rapid_skip_penalty() -> i32 { -2 }
fn default_report_penalty() -> i32 { -3 }
fn default_block_penalty() -> i32 { -5 }
fn default_reconnect_bonus() -> i32 { 2 }

/// Thresholds and windows governing the reputation model.
#[derive(Debug, Clone)]
pub struct ReputationPolicy {
    pub weights: ReputationWeights,
    /// Sessions at or above this duration count as meaningful (inclusive).
    pub meaningful_session: Duration,
    /// Sessions below this duration penalize the user who ended them.
    pub too_short_session: Duration,
    /// Skips beyond this count inside the window trigger the penalty.
    pub rapid_skip_limit: usize,
    pub rapid_skip_window: Duration,
}

impl Default for ReputationPolicy {
    fn default() -> Self {
        Self {
            weights: ReputationWeights::default(),
            meaningful_session: Duration::from_secs(180),
            too_short_session: Duration::from_secs(10),
            rapid_skip_limit: 3,
            rapid_skip_window: Duration::from_secs(60),
        }
    }
}

/// Score deltas for the two sides of a session that just ended.
/// `initiator` is the side that ended it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionEndDeltas {
    pub initiator: i32,
    pub partner: i32,
}

/// Compute the compounding session-end deltas.
pub fn session_end_deltas(
    duration: Duration,
    initiator_premium: bool,
    policy: &ReputationPolicy,
) -> SessionEndDeltas {
    let mut deltas = SessionEndDeltas::default();

    if duration >= policy.meaningful_session {
        deltas.initiator += policy.weights.meaningful_session;
        deltas.partner += policy.weights.meaningful_session;
    }

    if duration < policy.too_short_session {
        deltas.initiator += policy.weights.short_session_penalty;
    }

    if initiator_premium {
        deltas.initiator += policy.weights.premium_loyalty_bonus;
    }

    deltas
}

/// Record a skip into a user's sliding timestamp list, pruning entries
/// outside the window. Returns true when the skip count exceeds the limit
/// and the rapid-skip penalty applies.
pub fn record_skip(
    history: &mut VecDeque<Instant>,
    now: Instant,
    policy: &ReputationPolicy,
) -> bool {
    while let Some(&front) = history.front() {
        if now.duration_since(front) > policy.rapid_skip_window {
            history.pop_front();
        } else {
            break;
        }
    }

    history.push_back(now);
    history.len() > policy.rapid_skip_limit
}

/// One decay step: the score moves one unit toward zero. Decay alone never
/// pushes a score past zero; only event penalties produce negative scores.
#[inline]
pub fn decay_step(score: i32) -> i32 {
    score - score.signum()
}

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::eligibility::is_eligible;
use crate::models::{SearchMode, UserId, UserProfile};

/// Cutoffs governing candidate selection.
#[derive(Debug, Clone, Copy)]
pub struct SelectionPolicy {
    /// Candidates at or above this score form the preferred pool.
    pub preferred_cutoff: i32,
    /// Candidates at or below this score are invisible to matching.
    pub shadow_ban_cutoff: i32,
    /// Share of the preferred pool (sorted by score) eligible for the
    /// random draw; rounded up, never below one candidate.
    pub preferred_slice_ratio: f64,
    pub report_ban_threshold: i32,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            preferred_cutoff: -5,
            shadow_ban_cutoff: -10,
            preferred_slice_ratio: 0.75,
            report_ban_threshold: 3,
        }
    }
}

/// A waiting user offered to the matchmaker: stored profile plus the mode
/// the user is queued under.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub profile: UserProfile,
    pub waiting_mode: SearchMode,
}

/// Select a partner for `requester` from the waiting candidates, given in
/// arrival (FIFO) order.
///
/// Selection pipeline:
/// 1. Shadow-banned candidates are dropped from every pool.
/// 2. A candidate must be mutually compatible: eligible under the
///    requester's mode, and the requester must satisfy the candidate's own
///    waiting-mode predicate.
/// 3. Open-mode requests take the first available open-mode candidate
///    before any ranking, since open mode has no attribute to rank on.
/// 4. Otherwise candidates split into preferred (score at or above the
///    cutoff) and others; the preferred pool is sorted descending by score
///    and one of its top 75% (rounded up, min 1) is drawn uniformly at
///    random. The others pool is a plain uniform draw.
pub fn choose_partner<R: Rng + ?Sized>(
    rng: &mut R,
    requester: &UserProfile,
    mode: &SearchMode,
    candidates: &[Candidate],
    policy: &SelectionPolicy,
) -> Option<UserId> {
    let eligible: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.profile.reputation_score > policy.shadow_ban_cutoff)
        .filter(|c| is_eligible(requester, &c.profile, mode, policy.report_ban_threshold))
        .filter(|c| {
            is_eligible(&c.profile, requester, &c.waiting_mode, policy.report_ban_threshold)
        })
        .collect();

    if eligible.is_empty() {
        return None;
    }

    if *mode == SearchMode::Open {
        if let Some(first) = eligible.iter().find(|c| c.waiting_mode == SearchMode::Open) {
            return Some(first.profile.user_id);
        }
    }

    let (mut preferred, others): (Vec<&Candidate>, Vec<&Candidate>) = eligible
        .into_iter()
        .partition(|c| c.profile.reputation_score >= policy.preferred_cutoff);

    if !preferred.is_empty() {
        preferred.sort_by(|a, b| b.profile.reputation_score.cmp(&a.profile.reputation_score));

        let slice_len = ((preferred.len() as f64) * policy.preferred_slice_ratio).ceil() as usize;
        let slice_len = slice_len.clamp(1, preferred.len());

        return preferred[..slice_len]
            .choose(rng)
            .map(|c| c.profile.user_id);
    }

    others.choose(rng).map(|c| c.profile.user_id)
}

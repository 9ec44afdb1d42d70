use crate::models::{SearchMode, UserProfile};

/// Check whether `candidate` is a legal match target for `requester` in
/// the given mode.
///
/// Hard exclusions apply in every mode; the attribute predicate and the
/// premium gate depend on the mode. Candidates at or above the report ban
/// threshold are rejected here even though they should already be banned.
#[inline]
pub fn is_eligible(
    requester: &UserProfile,
    candidate: &UserProfile,
    mode: &SearchMode,
    report_ban_threshold: i32,
) -> bool {
    if candidate.is_banned {
        return false;
    }

    if candidate.user_id == requester.user_id {
        return false;
    }

    // Blocks are directional in storage; both directions exclude.
    if requester.has_blocked(candidate.user_id) || candidate.has_blocked(requester.user_id) {
        return false;
    }

    if candidate.report_count >= report_ban_threshold {
        return false;
    }

    if mode.requires_premium() && !requester.is_premium() {
        return false;
    }

    matches_mode_predicate(requester, candidate, mode)
}

/// The attribute predicate of a mode, without the hard exclusions.
#[inline]
fn matches_mode_predicate(
    requester: &UserProfile,
    candidate: &UserProfile,
    mode: &SearchMode,
) -> bool {
    match mode {
        SearchMode::Open => true,
        SearchMode::Gender { target } => candidate
            .gender
            .as_deref()
            .map_or(false, |g| g.eq_ignore_ascii_case(target)),
        SearchMode::City => match (requester.city.as_deref(), candidate.city.as_deref()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        },
        SearchMode::Interests => candidate
            .interests
            .iter()
            .any(|tag| requester.interests.iter().any(|own| own == tag)),
    }
}

// Engine exports
pub mod reconnect;
pub mod session;
pub mod state;

pub use state::{ActiveSession, MatchState, SessionTable};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::{choose_partner, Candidate, ReputationPolicy, SelectionPolicy};
use crate::models::{NotifyEvent, SearchMode, UserId, UserProfile};
use crate::services::{CandidateFilter, Notifier, ProfileStore, StoreError};

/// Errors surfaced to the transport adapter. `NoEligibleCandidate` is not
/// an error: an unmatched search is the `Enqueued` outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("user {0} is already in an active session")]
    AlreadyInSession(UserId),

    #[error("user {0} is already searching")]
    AlreadySearching(UserId),

    #[error("user {0} is banned from matching")]
    Banned(UserId),

    #[error("this search mode requires an active premium subscription")]
    PremiumRequired(UserId),

    #[error("no previous partner on record for user {0}")]
    NoHistory(UserId),

    #[error("previous partner is currently unreachable")]
    PartnerUnavailable,

    #[error("pairing is blocked")]
    Blocked,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Matched { session_id: Uuid, partner: UserId },
    Enqueued,
}

/// Result of a relay request. A delivery failure is an implicit
/// disconnect, reported as `SessionClosed` rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    NoActiveSession,
    SessionClosed,
}

/// Live gauges over the shared matching state.
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    pub waiting: usize,
    pub active_sessions: usize,
}

/// Engine tunables, assembled from `Settings` in production and defaulted
/// in tests.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
    pub search_timeout: Duration,
    pub selection: SelectionPolicy,
    pub reputation: ReputationPolicy,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            search_timeout: Duration::from_secs(60),
            selection: SelectionPolicy::default(),
            reputation: ReputationPolicy::default(),
        }
    }
}

/// The matchmaking and session engine.
///
/// Cheaply clonable: clones share the store, notifier, and matching state,
/// so per-entry timeout tasks can hold their own handle.
pub struct Engine<S, N> {
    pub(crate) store: Arc<S>,
    pub(crate) notifier: Arc<N>,
    pub(crate) policy: Arc<EnginePolicy>,
    pub(crate) state: Arc<Mutex<MatchState>>,
}

impl<S, N> Clone for Engine<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            policy: Arc::clone(&self.policy),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S, N> Engine<S, N>
where
    S: ProfileStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, policy: EnginePolicy) -> Self {
        Self {
            store,
            notifier,
            policy: Arc::new(policy),
            state: Arc::new(Mutex::new(MatchState::new())),
        }
    }

    /// Handle a search request: try to pair immediately, otherwise enqueue
    /// the requester and arm the search timeout.
    pub async fn on_search(
        &self,
        user_id: UserId,
        mode: SearchMode,
    ) -> Result<SearchOutcome, EngineError> {
        let mut state = self.state.lock().await;

        if state.sessions.contains(user_id) {
            return Err(EngineError::AlreadyInSession(user_id));
        }
        if state.queue.contains(user_id) {
            return Err(EngineError::AlreadySearching(user_id));
        }

        let requester = self.store.get_profile(user_id).await?;
        if requester.is_banned {
            return Err(EngineError::Banned(user_id));
        }
        if mode.requires_premium() && !requester.is_premium() {
            return Err(EngineError::PremiumRequired(user_id));
        }

        let chosen = self.pick_candidate(&state, &requester, &mode).await?;

        match chosen {
            Some(partner) => {
                let session_id = self.connect_locked(&mut state, &requester, &partner).await?;
                Ok(SearchOutcome::Matched { session_id, partner: partner.user_id })
            }
            None => {
                // Store write first: a store failure must not enqueue.
                self.store.set_online(user_id, true).await?;
                let token = state.queue.enqueue(user_id, mode, Instant::now());
                self.arm_search_timeout(user_id, token);
                tracing::debug!("user {} enqueued, waiting for a match", user_id);
                Ok(SearchOutcome::Enqueued)
            }
        }
    }

    /// Fetch the waiting users' profiles and run candidate selection.
    async fn pick_candidate(
        &self,
        state: &MatchState,
        requester: &UserProfile,
        mode: &SearchMode,
    ) -> Result<Option<UserProfile>, EngineError> {
        let waiting_ids = state.queue.fifo_ids();
        if waiting_ids.is_empty() {
            return Ok(None);
        }

        let filter = CandidateFilter {
            candidate_ids: waiting_ids.clone(),
            exclude: requester.user_id,
        };
        let profiles = self.store.query_candidates(&filter).await?;
        let mut by_id: HashMap<UserId, UserProfile> =
            profiles.into_iter().map(|p| (p.user_id, p)).collect();

        // Preserve arrival order for the open-mode first-available pass.
        let candidates: Vec<Candidate> = waiting_ids
            .iter()
            .filter_map(|id| {
                let profile = by_id.get(id)?.clone();
                let waiting_mode = state.queue.mode_of(*id)?.clone();
                Some(Candidate { profile, waiting_mode })
            })
            .collect();

        let chosen_id = {
            let mut rng = rand::thread_rng();
            choose_partner(&mut rng, requester, mode, &candidates, &self.policy.selection)
        };

        Ok(chosen_id.and_then(|id| by_id.remove(&id)))
    }

    fn arm_search_timeout(&self, user_id: UserId, token: u64) {
        let engine = self.clone();
        let timeout = self.policy.search_timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            engine.expire_waiting_entry(user_id, token).await;
        });
    }

    /// Timeout body: a no-op when the entry was already consumed by a
    /// match or cancellation (the token no longer matches).
    async fn expire_waiting_entry(&self, user_id: UserId, token: u64) {
        let state = &mut *self.state.lock().await;
        if !state.queue.remove_if_token(user_id, token) {
            return;
        }

        if let Err(err) = self.store.set_online(user_id, false).await {
            tracing::warn!("failed to mark {} offline after timeout: {}", user_id, err);
        }
        self.try_notify(user_id, NotifyEvent::NoMatchFound).await;
        tracing::debug!("search timed out for user {}", user_id);
    }

    /// One reputation decay sweep over all stored profiles.
    pub async fn run_decay_sweep(&self) -> Result<u64, EngineError> {
        Ok(self.store.decay_reputation_step().await?)
    }

    pub async fn stats(&self) -> EngineStats {
        let state = self.state.lock().await;
        EngineStats {
            waiting: state.queue.len(),
            active_sessions: state.sessions.pair_count(),
        }
    }

    pub async fn is_searching(&self, user_id: UserId) -> bool {
        self.state.lock().await.queue.contains(user_id)
    }

    pub async fn current_partner(&self, user_id: UserId) -> Option<UserId> {
        self.state
            .lock()
            .await
            .sessions
            .get(user_id)
            .map(|active| active.partner)
    }

    pub(crate) async fn try_notify(&self, user_id: UserId, event: NotifyEvent) {
        if let Err(err) = self.notifier.notify(user_id, event).await {
            tracing::warn!("notify to {} failed: {}", user_id, err);
        }
    }

    pub(crate) async fn apply_reputation(&self, user_id: UserId, delta: i32) {
        if delta == 0 {
            return;
        }
        if let Err(err) = self.store.update_reputation(user_id, delta).await {
            tracing::warn!("reputation update for {} failed: {}", user_id, err);
        }
    }
}

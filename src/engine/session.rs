use std::time::Instant;

use uuid::Uuid;

use crate::core::{record_skip, session_end_deltas};
use crate::engine::{Engine, EngineError, MatchState, RelayOutcome, SearchOutcome};
use crate::models::{MessagePayload, NotifyEvent, PartnerSnippet, SearchMode, UserId, UserProfile};
use crate::services::{Notifier, ProfileStore};

impl<S, N> Engine<S, N>
where
    S: ProfileStore + 'static,
    N: Notifier + 'static,
{
    /// Establish a session between two users.
    ///
    /// Any prior session of either side is torn down first, which keeps
    /// the at-most-one-session invariant even when a user is connected
    /// twice in quick succession. Store writes happen before the in-memory
    /// commit so a store failure never leaves a half-applied connect.
    pub(crate) async fn connect_locked(
        &self,
        state: &mut MatchState,
        a: &UserProfile,
        b: &UserProfile,
    ) -> Result<Uuid, EngineError> {
        if state.sessions.contains(a.user_id) {
            let _ = self.disconnect_locked(state, a.user_id, true, true).await;
        }
        if state.sessions.contains(b.user_id) {
            let _ = self.disconnect_locked(state, b.user_id, true, true).await;
        }

        self.store.set_online(a.user_id, true).await?;
        self.store.set_online(b.user_id, true).await?;
        self.store.set_last_partner(a.user_id, b.user_id).await?;
        self.store.set_last_partner(b.user_id, a.user_id).await?;

        let _ = state.queue.remove(a.user_id);
        let _ = state.queue.remove(b.user_id);

        let session_id = Uuid::new_v4();
        state
            .sessions
            .insert(a.user_id, b.user_id, session_id, Instant::now());
        tracing::info!("session {} connected ({} <-> {})", session_id, a.user_id, b.user_id);

        for (user, partner) in [(a, b), (b, a)] {
            if !user.safety_notice_sent {
                self.try_notify(user.user_id, NotifyEvent::SafetyNotice).await;
                if let Err(err) = self.store.mark_safety_notice_sent(user.user_id).await {
                    tracing::warn!("failed to persist safety notice for {}: {}", user.user_id, err);
                }
            }

            self.try_notify(
                user.user_id,
                NotifyEvent::MatchFound { session_id, partner: PartnerSnippet::redacted() },
            )
            .await;

            // Extended partner attributes are a premium perk.
            let snippet = if user.is_premium() {
                PartnerSnippet::full(partner)
            } else {
                PartnerSnippet::redacted()
            };
            self.try_notify(user.user_id, NotifyEvent::PartnerDetails { partner: snippet })
                .await;
        }

        Ok(session_id)
    }

    /// Tear down the initiator's session, applying session-end reputation
    /// deltas. A no-op (returning `None`) for users outside any session,
    /// so repeated stops never double-apply penalties.
    ///
    /// In-memory removal comes first: whatever happens to the store, no
    /// user stays stuck in a dead session. Store writes are best-effort
    /// and logged.
    pub(crate) async fn disconnect_locked(
        &self,
        state: &mut MatchState,
        initiator: UserId,
        notify_initiator: bool,
        notify_partner: bool,
    ) -> Option<UserId> {
        let active = state.sessions.remove_pair(initiator)?;
        let partner = active.partner;
        let duration = active.started_at.elapsed();

        let initiator_premium = match self.store.get_profile(initiator).await {
            Ok(profile) => profile.is_premium(),
            Err(err) => {
                tracing::warn!("profile fetch for {} failed during disconnect: {}", initiator, err);
                false
            }
        };

        let deltas = session_end_deltas(duration, initiator_premium, &self.policy.reputation);
        self.apply_reputation(initiator, deltas.initiator).await;
        self.apply_reputation(partner, deltas.partner).await;

        for user in [initiator, partner] {
            if let Err(err) = self.store.set_online(user, false).await {
                tracing::warn!("failed to mark {} offline: {}", user, err);
            }
        }

        if notify_initiator {
            self.try_notify(initiator, NotifyEvent::ChatEnded).await;
        }
        if notify_partner {
            self.try_notify(partner, NotifyEvent::ChatEnded).await;
        }

        tracing::info!(
            "session {} closed by {} after {:?}",
            active.session_id,
            initiator,
            duration
        );

        Some(partner)
    }

    /// Stop the current chat, or cancel a pending search.
    pub async fn on_stop(&self, user_id: UserId) -> Result<(), EngineError> {
        let state = &mut *self.state.lock().await;

        if state.sessions.contains(user_id) {
            let _ = self.disconnect_locked(state, user_id, true, true).await;
            return Ok(());
        }

        if state.queue.remove(user_id).is_some() {
            if let Err(err) = self.store.set_online(user_id, false).await {
                tracing::warn!("failed to mark {} offline after cancel: {}", user_id, err);
            }
            tracing::debug!("user {} cancelled their search", user_id);
        }

        Ok(())
    }

    /// Skip the current partner and immediately search again in open mode.
    ///
    /// The skipped partner is rewarded for staying; the skipper is tracked
    /// against the rapid-skip window and penalized past the limit, on top
    /// of the regular session-end deltas.
    pub async fn on_skip(&self, user_id: UserId) -> Result<SearchOutcome, EngineError> {
        {
            let state = &mut *self.state.lock().await;

            if let Some(skipped) = self.disconnect_locked(state, user_id, false, true).await {
                self.apply_reputation(skipped, self.policy.reputation.weights.skipped_reward)
                    .await;

                let rapid = {
                    let history = state.skip_history.entry(user_id).or_default();
                    record_skip(history, Instant::now(), &self.policy.reputation)
                };
                if rapid {
                    tracing::debug!("rapid-skip penalty for user {}", user_id);
                    self.apply_reputation(
                        user_id,
                        self.policy.reputation.weights.rapid_skip_penalty,
                    )
                    .await;
                }
            }
        }

        self.on_search(user_id, SearchMode::Open).await
    }

    /// Report the current partner: append the report row, bump the
    /// counter (banning at the threshold), penalize, and end the chat.
    pub async fn on_report(&self, reporter: UserId, reason: &str) -> Result<(), EngineError> {
        let state = &mut *self.state.lock().await;

        let Some(active) = state.sessions.get(reporter) else {
            tracing::debug!("report from {} outside any session ignored", reporter);
            return Ok(());
        };
        let reported = active.partner;

        self.store.insert_report(reporter, reported, reason).await?;
        let count = self.store.increment_report_count(reported).await?;
        self.apply_reputation(reported, self.policy.reputation.weights.report_penalty)
            .await;

        if count >= self.policy.selection.report_ban_threshold {
            if let Err(err) = self.store.set_banned(reported).await {
                tracing::warn!("failed to ban {} at report threshold: {}", reported, err);
            }
        }

        let _ = self.disconnect_locked(state, reporter, false, true).await;
        self.try_notify(reporter, NotifyEvent::ReportSubmitted).await;

        Ok(())
    }

    /// Block the current partner, falling back to the most recent one
    /// when idle. Ends any active session.
    pub async fn on_block(&self, blocker: UserId) -> Result<(), EngineError> {
        let state = &mut *self.state.lock().await;

        let target = match state.sessions.get(blocker) {
            Some(active) => Some(active.partner),
            None => self.store.get_profile(blocker).await?.last_partner_id,
        };
        let Some(blocked) = target else {
            tracing::debug!("block from {} with no partner ignored", blocker);
            return Ok(());
        };

        self.store.append_blocked(blocker, blocked).await?;
        self.apply_reputation(blocked, self.policy.reputation.weights.block_penalty)
            .await;

        let _ = self.disconnect_locked(state, blocker, true, true).await;

        Ok(())
    }

    /// Relay a message payload to the sender's current partner, unchanged.
    /// Delivery failure tears the session down as if the sender stopped it.
    pub async fn on_message(
        &self,
        sender: UserId,
        payload: &MessagePayload,
    ) -> Result<RelayOutcome, EngineError> {
        let state = &mut *self.state.lock().await;

        let Some(active) = state.sessions.get(sender) else {
            return Ok(RelayOutcome::NoActiveSession);
        };
        let partner = active.partner;

        match self.notifier.relay(partner, payload).await {
            Ok(()) => Ok(RelayOutcome::Delivered),
            Err(err) => {
                tracing::warn!("delivery to {} failed ({}), closing session", partner, err);
                let _ = self.disconnect_locked(state, sender, true, true).await;
                Ok(RelayOutcome::SessionClosed)
            }
        }
    }
}

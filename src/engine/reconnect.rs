use uuid::Uuid;

use crate::engine::{Engine, EngineError};
use crate::models::UserId;
use crate::services::{Notifier, ProfileStore, StoreError};

impl<S, N> Engine<S, N>
where
    S: ProfileStore + 'static,
    N: Notifier + 'static,
{
    /// Re-establish the requester's most recent session.
    ///
    /// Preconditions are checked in order, each with its own failure:
    /// already in a session, no partner on record, partner not reachable,
    /// block in either direction. Success connects through the session
    /// manager and awards the reconnect bonus to the requester.
    pub async fn on_reconnect(&self, requester: UserId) -> Result<Uuid, EngineError> {
        let state = &mut *self.state.lock().await;

        if state.sessions.contains(requester) {
            return Err(EngineError::AlreadyInSession(requester));
        }

        let profile = self.store.get_profile(requester).await?;
        let partner_id = profile
            .last_partner_id
            .ok_or(EngineError::NoHistory(requester))?;

        let partner = match self.store.get_profile(partner_id).await {
            Ok(partner) => partner,
            Err(StoreError::NotFound(_)) => return Err(EngineError::PartnerUnavailable),
            Err(err) => return Err(err.into()),
        };

        if !partner.is_online {
            return Err(EngineError::PartnerUnavailable);
        }

        if profile.has_blocked(partner_id) || partner.has_blocked(requester) {
            return Err(EngineError::Blocked);
        }

        let session_id = self.connect_locked(state, &profile, &partner).await?;
        self.apply_reputation(requester, self.policy.reputation.weights.reconnect_bonus)
            .await;

        tracing::info!("user {} reconnected to their previous partner", requester);
        Ok(session_id)
    }
}

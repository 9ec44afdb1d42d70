use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use uuid::Uuid;

use crate::core::WaitingQueue;
use crate::models::UserId;

/// One side of an active pairing.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session_id: Uuid,
    pub partner: UserId,
    pub started_at: Instant,
}

/// Bidirectional active-pairing table. Both directions are stored so a
/// partner lookup is a single map read; insert/remove keep them in sync.
#[derive(Debug, Default)]
pub struct SessionTable {
    partners: HashMap<UserId, ActiveSession>,
}

impl SessionTable {
    pub fn insert(&mut self, a: UserId, b: UserId, session_id: Uuid, started_at: Instant) {
        self.partners
            .insert(a, ActiveSession { session_id, partner: b, started_at });
        self.partners
            .insert(b, ActiveSession { session_id, partner: a, started_at });
    }

    /// Remove both directions of the user's session, if any.
    pub fn remove_pair(&mut self, user_id: UserId) -> Option<ActiveSession> {
        let active = self.partners.remove(&user_id)?;
        self.partners.remove(&active.partner);
        Some(active)
    }

    pub fn get(&self, user_id: UserId) -> Option<&ActiveSession> {
        self.partners.get(&user_id)
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.partners.contains_key(&user_id)
    }

    pub fn pair_count(&self) -> usize {
        self.partners.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

/// All mutable matching state, guarded by a single async lock so every
/// check-then-act sequence against queue or sessions is atomic.
#[derive(Debug, Default)]
pub struct MatchState {
    pub queue: WaitingQueue,
    pub sessions: SessionTable,
    pub skip_history: HashMap<UserId, VecDeque<Instant>>,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_table_is_bidirectional() {
        let mut table = SessionTable::default();
        let id = Uuid::new_v4();
        table.insert(1, 2, id, Instant::now());

        assert_eq!(table.get(1).unwrap().partner, 2);
        assert_eq!(table.get(2).unwrap().partner, 1);
        assert_eq!(table.pair_count(), 1);
    }

    #[test]
    fn test_remove_pair_clears_both_sides() {
        let mut table = SessionTable::default();
        table.insert(1, 2, Uuid::new_v4(), Instant::now());

        let closed = table.remove_pair(2).unwrap();
        assert_eq!(closed.partner, 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_pair_missing_is_none() {
        let mut table = SessionTable::default();
        assert!(table.remove_pair(7).is_none());
    }
}

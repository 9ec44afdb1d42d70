use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::models::{SearchMode, UserId};

/// A live search entry. The token ties the entry to its timeout timer: a
/// timer whose token no longer matches must treat the firing as a no-op.
#[derive(Debug, Clone)]
pub struct WaitingEntry {
    pub user_id: UserId,
    pub mode: SearchMode,
    pub enqueued_at: Instant,
    pub token: u64,
}

/// The set of users currently seeking a partner, with FIFO arrival order.
/// A user has at most one entry across all modes; re-enqueueing replaces
/// the prior entry (and invalidates its timer token).
#[derive(Debug, Default)]
pub struct WaitingQueue {
    entries: HashMap<UserId, WaitingEntry>,
    order: VecDeque<UserId>,
    next_token: u64,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry for the user, replacing any prior one. Returns the
    /// token to arm the entry's timeout with.
    pub fn enqueue(&mut self, user_id: UserId, mode: SearchMode, now: Instant) -> u64 {
        self.remove(user_id);

        self.next_token += 1;
        let token = self.next_token;
        self.entries.insert(
            user_id,
            WaitingEntry { user_id, mode, enqueued_at: now, token },
        );
        self.order.push_back(user_id);
        token
    }

    /// Remove the user's entry if present.
    pub fn remove(&mut self, user_id: UserId) -> Option<WaitingEntry> {
        let entry = self.entries.remove(&user_id)?;
        self.order.retain(|&u| u != user_id);
        Some(entry)
    }

    /// Remove the user's entry only if the token still matches; used by
    /// timeout timers so a firing after the entry was consumed is a no-op.
    pub fn remove_if_token(&mut self, user_id: UserId, token: u64) -> bool {
        match self.entries.get(&user_id) {
            Some(entry) if entry.token == token => {
                self.remove(user_id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.entries.contains_key(&user_id)
    }

    pub fn mode_of(&self, user_id: UserId) -> Option<&SearchMode> {
        self.entries.get(&user_id).map(|e| &e.mode)
    }

    /// Waiting user ids in arrival order.
    pub fn fifo_ids(&self) -> Vec<UserId> {
        self.order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_entry_per_user() {
        let mut queue = WaitingQueue::new();
        let now = Instant::now();

        queue.enqueue(1, SearchMode::Open, now);
        queue.enqueue(1, SearchMode::City, now);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.mode_of(1), Some(&SearchMode::City));
    }

    #[test]
    fn test_fifo_order_preserved() {
        let mut queue = WaitingQueue::new();
        let now = Instant::now();

        queue.enqueue(3, SearchMode::Open, now);
        queue.enqueue(1, SearchMode::Open, now);
        queue.enqueue(2, SearchMode::Open, now);
        queue.remove(1);

        assert_eq!(queue.fifo_ids(), vec![3, 2]);
    }

    #[test]
    fn test_reenqueue_moves_to_back() {
        let mut queue = WaitingQueue::new();
        let now = Instant::now();

        queue.enqueue(1, SearchMode::Open, now);
        queue.enqueue(2, SearchMode::Open, now);
        queue.enqueue(1, SearchMode::Open, now);

        assert_eq!(queue.fifo_ids(), vec![2, 1]);
    }

    #[test]
    fn test_stale_token_is_noop() {
        let mut queue = WaitingQueue::new();
        let now = Instant::now();

        let first = queue.enqueue(1, SearchMode::Open, now);
        let second = queue.enqueue(1, SearchMode::Open, now);

        assert!(!queue.remove_if_token(1, first));
        assert!(queue.contains(1));
        assert!(queue.remove_if_token(1, second));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_if_token_after_consume() {
        let mut queue = WaitingQueue::new();
        let now = Instant::now();

        let token = queue.enqueue(1, SearchMode::Open, now);
        queue.remove(1);

        assert!(!queue.remove_if_token(1, token));
    }
}

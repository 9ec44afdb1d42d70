#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use chatogram_engine::engine::EnginePolicy;
use chatogram_engine::models::{MessagePayload, NotifyEvent, UserId, UserProfile};
use chatogram_engine::services::{
    CandidateFilter, Notifier, ProfileStore, StoreError, TransportError,
};
use chatogram_engine::Engine;

pub type TestEngine = Engine<MemoryStore, RecordingNotifier>;

/// Build an engine over fresh in-memory collaborators.
pub fn engine() -> (TestEngine, Arc<MemoryStore>, Arc<RecordingNotifier>) {
    engine_with_policy(EnginePolicy::default())
}

pub fn engine_with_policy(
    policy: EnginePolicy,
) -> (TestEngine, Arc<MemoryStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = Engine::new(Arc::clone(&store), Arc::clone(&notifier), policy);
    (engine, store, notifier)
}

pub fn profile(id: UserId) -> UserProfile {
    UserProfile {
        user_id: id,
        gender: Some("Female".to_string()),
        city: Some("Delhi".to_string()),
        interests: vec!["music".to_string()],
        is_banned: false,
        is_online: false,
        blocked_users: vec![],
        report_count: 0,
        reputation_score: 0,
        premium_until: None,
        last_partner_id: None,
        safety_notice_sent: false,
        created_at: Some(Utc::now()),
    }
}

pub fn premium_profile(id: UserId) -> UserProfile {
    let mut p = profile(id);
    p.premium_until = Some(Utc::now() + Duration::days(7));
    p
}

/// In-memory profile store backing the engine tests.
pub struct MemoryStore {
    profiles: Mutex<HashMap<UserId, UserProfile>>,
    reports: Mutex<Vec<(UserId, UserId, String)>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            reports: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, profile: UserProfile) {
        self.profiles.lock().unwrap().insert(profile.user_id, profile);
    }

    pub fn profile(&self, id: UserId) -> UserProfile {
        self.profiles.lock().unwrap().get(&id).cloned().expect("profile missing")
    }

    pub fn score(&self, id: UserId) -> i32 {
        self.profile(id).reputation_score
    }

    pub fn reports(&self) -> Vec<(UserId, UserId, String)> {
        self.reports.lock().unwrap().clone()
    }

    /// Mutate a stored profile directly, bypassing the store contract.
    pub fn update<F: FnOnce(&mut UserProfile)>(&self, id: UserId, f: F) {
        let mut profiles = self.profiles.lock().unwrap();
        f(profiles.get_mut(&id).expect("profile missing"));
    }

    /// Make every store call fail with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn with_profile<F: FnOnce(&mut UserProfile)>(
        &self,
        id: UserId,
        f: F,
    ) -> Result<(), StoreError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        f(profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, id: UserId) -> Result<UserProfile, StoreError> {
        self.check_available()?;
        self.profiles
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn query_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<UserProfile>, StoreError> {
        self.check_available()?;
        let profiles = self.profiles.lock().unwrap();
        Ok(filter
            .candidate_ids
            .iter()
            .filter(|&&id| id != filter.exclude)
            .filter_map(|id| profiles.get(id))
            .filter(|p| !p.is_banned)
            .cloned()
            .collect())
    }

    async fn update_reputation(&self, id: UserId, delta: i32) -> Result<(), StoreError> {
        self.check_available()?;
        self.with_profile(id, |p| p.reputation_score += delta)
    }

    async fn increment_report_count(&self, id: UserId) -> Result<i32, StoreError> {
        self.check_available()?;
        let mut count = 0;
        self.with_profile(id, |p| {
            p.report_count += 1;
            count = p.report_count;
        })?;
        Ok(count)
    }

    async fn set_banned(&self, id: UserId) -> Result<(), StoreError> {
        self.check_available()?;
        self.with_profile(id, |p| p.is_banned = true)
    }

    async fn set_online(&self, id: UserId, online: bool) -> Result<(), StoreError> {
        self.check_available()?;
        self.with_profile(id, |p| p.is_online = online)
    }

    async fn set_last_partner(&self, id: UserId, partner: UserId) -> Result<(), StoreError> {
        self.check_available()?;
        self.with_profile(id, |p| p.last_partner_id = Some(partner))
    }

    async fn append_blocked(&self, id: UserId, blocked: UserId) -> Result<(), StoreError> {
        self.check_available()?;
        self.with_profile(id, |p| {
            if !p.blocked_users.contains(&blocked) {
                p.blocked_users.push(blocked);
            }
        })
    }

    async fn insert_report(
        &self,
        reporter: UserId,
        reported: UserId,
        reason: &str,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.reports
            .lock()
            .unwrap()
            .push((reporter, reported, reason.to_string()));
        Ok(())
    }

    async fn mark_safety_notice_sent(&self, id: UserId) -> Result<(), StoreError> {
        self.check_available()?;
        self.with_profile(id, |p| p.safety_notice_sent = true)
    }

    async fn decay_reputation_step(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut touched = 0;
        let mut profiles = self.profiles.lock().unwrap();
        for profile in profiles.values_mut() {
            if profile.reputation_score != 0 {
                profile.reputation_score -= profile.reputation_score.signum();
                touched += 1;
            }
        }
        Ok(touched)
    }
}

/// Notifier that records everything and can simulate unreachable users.
pub struct RecordingNotifier {
    events: Mutex<Vec<(UserId, NotifyEvent)>>,
    relayed: Mutex<Vec<(UserId, MessagePayload)>>,
    unreachable: Mutex<HashSet<UserId>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            relayed: Mutex::new(Vec::new()),
            unreachable: Mutex::new(HashSet::new()),
        }
    }

    pub fn make_unreachable(&self, user_id: UserId) {
        self.unreachable.lock().unwrap().insert(user_id);
    }

    pub fn events_for(&self, user_id: UserId) -> Vec<NotifyEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn count_for<F: Fn(&NotifyEvent) -> bool>(&self, user_id: UserId, pred: F) -> usize {
        self.events_for(user_id).iter().filter(|e| pred(e)).count()
    }

    pub fn relayed_to(&self, user_id: UserId) -> Vec<MessagePayload> {
        self.relayed
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: UserId, event: NotifyEvent) -> Result<(), TransportError> {
        self.events.lock().unwrap().push((user_id, event));
        Ok(())
    }

    async fn relay(
        &self,
        user_id: UserId,
        payload: &MessagePayload,
    ) -> Result<(), TransportError> {
        if self.unreachable.lock().unwrap().contains(&user_id) {
            return Err(TransportError::Delivery {
                user_id,
                reason: "unreachable".to_string(),
            });
        }
        self.relayed.lock().unwrap().push((user_id, payload.clone()));
        Ok(())
    }
}

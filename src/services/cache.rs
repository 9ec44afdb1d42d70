use std::time::Duration;

use crate::models::{UserId, UserProfile};

/// In-process profile cache in front of the profile store.
///
/// Entries expire on a short TTL and are invalidated eagerly whenever the
/// engine writes to the same profile, so matching decisions never act on
/// a profile the engine itself just changed.
pub struct ProfileCache {
    inner: moka::future::Cache<UserId, UserProfile>,
}

impl ProfileCache {
    pub fn new(max_capacity: u64, ttl_secs: u64) -> Self {
        let inner = moka::future::CacheBuilder::new(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner }
    }

    pub async fn get(&self, id: UserId) -> Option<UserProfile> {
        let hit = self.inner.get(&id).await;
        if hit.is_some() {
            tracing::trace!("profile cache hit: {}", id);
        }
        hit
    }

    pub async fn insert(&self, profile: UserProfile) {
        self.inner.insert(profile.user_id, profile).await;
    }

    pub async fn invalidate(&self, id: UserId) {
        self.inner.invalidate(&id).await;
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

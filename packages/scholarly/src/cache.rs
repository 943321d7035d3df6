//! TTL-bounded key/value cache and session lifecycle.
//!
//! Backs both session state and terminal request results. Entries are
//! evicted lazily on access; `sweep` exists for callers that want a
//! periodic memory bound.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

/// A cached value with expiry metadata.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: DateTime<Utc>,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = ChronoDuration::from_std(self.ttl).unwrap_or(ChronoDuration::MAX);
        now - self.created_at >= ttl
    }
}

/// Generic key/value cache with per-entry TTL and atomic per-key access.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get a value; expired entries are removed and reported absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Utc::now();
        {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Lazy eviction of the expired entry.
        self.entries.write().unwrap().remove(key);
        None
    }

    /// Insert or replace a value with the given TTL.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.write().unwrap().insert(
            key.into(),
            CacheEntry {
                value,
                created_at: Utc::now(),
                ttl,
            },
        );
    }

    /// Mutate an entry in place under the write lock, if present and live.
    ///
    /// Returns the updated value. Expiry is left untouched: mutation is
    /// not activity.
    pub fn update<F>(&self, key: &str, f: F) -> Option<V>
    where
        F: FnOnce(&mut V),
    {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                f(&mut entry.value);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Extend an entry's lifetime to `ttl` from now (sliding expiry).
    pub fn touch(&self, key: &str, ttl: Duration) -> bool {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.created_at = now;
                entry.ttl = ttl;
                true
            }
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        }
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.write().unwrap().remove(key).map(|e| e.value)
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Live entry count (expired entries not yet evicted are included).
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

/// A client session. Lifecycle is independent of research requests: a
/// session may span zero or many of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Session lifecycle over a [`TtlCache`].
///
/// Sessions get a sliding expiry: validation of a live session extends it,
/// creation alone does not keep extending anything.
pub struct SessionManager {
    sessions: TtlCache<Session>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: TtlCache::new(),
            ttl,
        }
    }

    /// Create a session and return its id.
    pub fn create(&self) -> Uuid {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + ChronoDuration::from_std(self.ttl).unwrap_or(ChronoDuration::MAX),
            last_activity: now,
        };
        let id = session.id;
        self.sessions.put(id.to_string(), session, self.ttl);
        id
    }

    /// Check liveness; a live session has its expiry extended.
    pub fn validate(&self, session_id: &Uuid) -> bool {
        let key = session_id.to_string();
        if self.sessions.get(&key).is_none() {
            return false;
        }
        let now = Utc::now();
        let expires_at = now + ChronoDuration::from_std(self.ttl).unwrap_or(ChronoDuration::MAX);
        self.sessions.update(&key, |session| {
            session.last_activity = now;
            session.expires_at = expires_at;
        });
        self.sessions.touch(&key, self.ttl)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_live_values() {
        let cache: TtlCache<String> = TtlCache::new();
        cache.put("k", "v".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn expired_entries_are_evicted_on_access() {
        let cache: TtlCache<i32> = TtlCache::new();
        cache.put("k", 1, Duration::from_secs(0));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let cache: TtlCache<i32> = TtlCache::new();
        cache.put("dead", 1, Duration::from_secs(0));
        cache.put("live", 2, Duration::from_secs(60));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn update_mutates_in_place() {
        let cache: TtlCache<Vec<i32>> = TtlCache::new();
        cache.put("k", vec![1], Duration::from_secs(60));
        let updated = cache.update("k", |v| v.push(2));
        assert_eq!(updated, Some(vec![1, 2]));
        assert_eq!(cache.update("missing", |_| {}), None);
    }

    #[test]
    fn session_create_then_validate() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let id = manager.create();
        assert!(manager.validate(&id));
        assert!(!manager.validate(&Uuid::new_v4()));
    }

    #[test]
    fn expired_session_is_invalid() {
        let manager = SessionManager::new(Duration::from_secs(0));
        let id = manager.create();
        assert!(!manager.validate(&id));
    }
}

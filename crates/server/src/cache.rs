//! Ephemeral key/value store with per-key expiry.
//!
//! Holds short-lived lab state: email verification codes, password reset
//! tokens and the login failure counters/locks. Backed by `moka` so that
//! expired entries are evicted in the background; reads also check the
//! deadline so an entry is never observed past its TTL.
//!
//! # Key layout
//!
//! | Key | TTL | Value |
//! |-----|-----|-------|
//! | `mailcode:{email}` | 600s | six digit code |
//! | `reset_token:{token}` | 3600s | user id |
//! | `login:fail:{email}` | 300s | failure count |
//! | `login:lock:{email}` | 300s | `"1"` |

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

/// Key for a pending email verification code.
#[must_use]
pub fn mailcode_key(email: &str) -> String {
    format!("mailcode:{email}")
}

/// Key for a password reset token.
#[must_use]
pub fn reset_token_key(token: &str) -> String {
    format!("reset_token:{token}")
}

/// Key for the consecutive login failure counter.
#[must_use]
pub fn login_fail_key(email: &str) -> String {
    format!("login:fail:{email}")
}

/// Key for the login lock flag.
#[must_use]
pub fn login_lock_key(email: &str) -> String {
    format!("login:lock:{email}")
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Hands each entry's own deadline to moka.
struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(&self, _key: &String, value: &Slot, created_at: Instant) -> Option<Duration> {
        value
            .expires_at
            .map(|at| at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Slot,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value
            .expires_at
            .map(|at| at.saturating_duration_since(updated_at))
    }
}

/// In-process TTL store shared by all handlers.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct EphemeralStore {
    cache: Cache<String, Slot>,
}

impl Default for EphemeralStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .expire_after(SlotExpiry)
            .build();
        Self { cache }
    }

    /// Get a live value.
    pub async fn get(&self, key: &str) -> Option<String> {
        let slot = self.cache.get(key).await?;
        if slot.is_live(Instant::now()) {
            Some(slot.value)
        } else {
            self.cache.invalidate(key).await;
            None
        }
    }

    /// Set a value that expires after `ttl`.
    pub async fn set_ex(&self, key: &str, value: impl Into<String>, ttl: Duration) {
        let slot = Slot {
            value: value.into(),
            expires_at: Some(Instant::now() + ttl),
        };
        self.cache.insert(key.to_owned(), slot).await;
    }

    /// Remove a key. Missing keys are ignored.
    pub async fn delete(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Remaining lifetime of a key, rounded up to whole seconds.
    ///
    /// Returns `None` when the key is missing, expired, or has no expiry.
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        let slot = self.cache.get(key).await?;
        let remaining = slot.expires_at?.checked_duration_since(Instant::now())?;
        if remaining.is_zero() {
            return None;
        }
        Some(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0))
    }

    /// Atomically increment a counter and return the new value.
    ///
    /// A missing or expired key starts at 1 and receives `ttl_on_create`;
    /// later increments keep the original deadline. Non-numeric values are
    /// treated as zero.
    pub async fn incr(&self, key: &str, ttl_on_create: Duration) -> i64 {
        let entry = self
            .cache
            .entry(key.to_owned())
            .and_upsert_with(|existing| {
                let now = Instant::now();
                let slot = match existing.map(moka::Entry::into_value) {
                    Some(slot) if slot.is_live(now) => Slot {
                        value: (slot.value.parse::<i64>().unwrap_or(0) + 1).to_string(),
                        expires_at: slot.expires_at,
                    },
                    _ => Slot {
                        value: "1".to_owned(),
                        expires_at: Some(now + ttl_on_create),
                    },
                };
                std::future::ready(slot)
            })
            .await;

        entry.into_value().value.parse().unwrap_or(1)
    }

    /// Drop every entry.
    pub fn flush(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = EphemeralStore::new();
        store
            .set_ex("mailcode:a@b.c", "123456", Duration::from_secs(600))
            .await;
        assert_eq!(store.get("mailcode:a@b.c").await.as_deref(), Some("123456"));

        store.delete("mailcode:a@b.c").await;
        assert_eq!(store.get("mailcode:a@b.c").await, None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = EphemeralStore::new();
        store.set_ex("k", "v", Duration::from_millis(30)).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.get("k").await, None);
        assert_eq!(store.ttl("k").await, None);
    }

    #[tokio::test]
    async fn test_ttl_rounds_up() {
        let store = EphemeralStore::new();
        store.set_ex("lock", "1", Duration::from_secs(300)).await;
        let ttl = store.ttl("lock").await.unwrap();
        assert!((299..=300).contains(&ttl));
        assert_eq!(store.ttl("missing").await, None);
    }

    #[tokio::test]
    async fn test_incr_counts_and_keeps_deadline() {
        let store = EphemeralStore::new();
        let key = login_fail_key("alice@test.com");
        assert_eq!(store.incr(&key, Duration::from_secs(300)).await, 1);
        assert_eq!(store.incr(&key, Duration::from_secs(5)).await, 2);
        assert_eq!(store.incr(&key, Duration::from_secs(5)).await, 3);
        // Deadline comes from the first increment, not the later ones.
        assert!(store.ttl(&key).await.unwrap() > 5);
    }

    #[tokio::test]
    async fn test_incr_restarts_after_expiry() {
        let store = EphemeralStore::new();
        store.incr("n", Duration::from_millis(20)).await;
        store.incr("n", Duration::from_millis(20)).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.incr("n", Duration::from_secs(1)).await, 1);
    }

    #[tokio::test]
    async fn test_flush() {
        let store = EphemeralStore::new();
        store.set_ex("a", "1", Duration::from_secs(60)).await;
        store.flush();
        assert_eq!(store.get("a").await, None);
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(mailcode_key("x@y"), "mailcode:x@y");
        assert_eq!(reset_token_key("abc"), "reset_token:abc");
        assert_eq!(login_lock_key("x@y"), "login:lock:x@y");
    }
}

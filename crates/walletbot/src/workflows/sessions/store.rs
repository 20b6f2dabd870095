use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::domain::{Session, SessionDefaults};
use crate::config::WalletConfig;

const SWEEP_EVERY: u64 = 64;

pub type SessionHandle = Arc<Mutex<Session>>;

/// Result of a lookup. `created` is set when the identity had no live session.
#[derive(Debug, Clone)]
pub struct SessionSlot {
    pub handle: SessionHandle,
    pub created: bool,
}

impl SessionSlot {
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        lock_session(&self.handle)
    }
}

/// Sessions keyed by identity, each behind its own mutex.
///
/// The map's shard locks are only held for lookups and never while waiting on
/// a session mutex, so a handler holding a session can never block the map.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
    defaults: SessionDefaults,
    ttl: Duration,
    created: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(&WalletConfig::default())
    }
}

impl SessionStore {
    pub fn new(config: &WalletConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            defaults: SessionDefaults::from(config),
            ttl: Duration::try_minutes(config.session_ttl_minutes)
                .unwrap_or_else(Duration::max_value),
            created: AtomicU64::new(0),
        }
    }

    pub fn get_or_create(&self, identity: &str) -> SessionSlot {
        let identity = identity.trim();
        let now = Utc::now();
        let fresh = || Arc::new(Mutex::new(Session::new(identity, &self.defaults, now)));

        let slot = match self.sessions.entry(identity.to_string()) {
            Entry::Occupied(mut occupied) => {
                if is_stale(occupied.get(), now, self.ttl) {
                    debug!(identity, "replacing expired session");
                    occupied.insert(fresh());
                    SessionSlot {
                        handle: Arc::clone(occupied.get()),
                        created: true,
                    }
                } else {
                    SessionSlot {
                        handle: Arc::clone(occupied.get()),
                        created: false,
                    }
                }
            }
            Entry::Vacant(vacant) => SessionSlot {
                handle: Arc::clone(vacant.insert(fresh()).value()),
                created: true,
            },
        };

        if slot.created {
            info!(identity, "session started");
            let count = self.created.fetch_add(1, Ordering::Relaxed) + 1;
            if count % SWEEP_EVERY == 0 {
                self.sweep(now);
            }
        }
        slot
    }

    /// Removes the identity's session. Must not be called while holding that
    /// session's lock.
    pub fn delete(&self, identity: &str) -> bool {
        match self.sessions.remove(identity.trim()) {
            Some((_, handle)) => {
                lock_session(&handle).retire();
                info!(identity, "session deleted");
                true
            }
            None => false,
        }
    }

    /// Removes `handle` only if it is still the identity's current session.
    /// The caller has already retired it.
    pub(crate) fn discard(&self, identity: &str, handle: &SessionHandle) {
        let removed = self
            .sessions
            .remove_if(identity.trim(), |_, current| Arc::ptr_eq(current, handle));
        if removed.is_some() {
            info!(identity, "session ended");
        }
    }

    /// Copy of the identity's live session, if any.
    pub fn snapshot(&self, identity: &str) -> Option<Session> {
        let handle = self
            .sessions
            .get(identity.trim())
            .map(|entry| Arc::clone(entry.value()))?;
        let session = lock_session(&handle);
        (!session.is_retired()).then(|| session.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn sweep(&self, now: DateTime<Utc>) {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, handle| !is_stale(handle, now, self.ttl));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "swept expired sessions");
        }
    }
}

fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Only inspects sessions nobody is using. A busy session is live by definition.
fn is_stale(handle: &SessionHandle, now: DateTime<Utc>, ttl: Duration) -> bool {
    let mut session = match handle.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        Err(TryLockError::WouldBlock) => return false,
    };
    if session.is_retired() {
        return true;
    }
    if session.is_expired(now, ttl) {
        session.retire();
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::sessions::Stage;

    #[test]
    fn first_lookup_creates_and_second_reuses() {
        let store = SessionStore::default();
        let first = store.get_or_create("alice");
        let second = store.get_or_create(" alice ");
        assert!(first.created);
        assert!(!second.created);
        assert!(Arc::ptr_eq(&first.handle, &second.handle));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn oversized_ttl_means_sessions_never_expire() {
        let config = WalletConfig {
            session_ttl_minutes: i64::MAX / 2,
            ..WalletConfig::default()
        };
        let store = SessionStore::new(&config);
        let first = store.get_or_create("alice");
        first.lock().touch(Utc::now() - Duration::days(3650));

        let second = store.get_or_create("alice");
        assert!(!second.created);
        assert!(Arc::ptr_eq(&first.handle, &second.handle));
    }

    #[test]
    fn expired_sessions_are_replaced() {
        let config = WalletConfig {
            session_ttl_minutes: 1,
            ..WalletConfig::default()
        };
        let store = SessionStore::new(&config);
        let first = store.get_or_create("alice");
        {
            let mut session = first.lock();
            session.advance(Stage::MainMenu);
            session.touch(Utc::now() - Duration::minutes(5));
        }

        let second = store.get_or_create("alice");
        assert!(second.created);
        assert!(!Arc::ptr_eq(&first.handle, &second.handle));
        assert!(first.lock().is_retired());
        assert_eq!(second.lock().stage(), Stage::AskPin);
    }

    #[test]
    fn busy_sessions_are_never_replaced() {
        let config = WalletConfig {
            session_ttl_minutes: 1,
            ..WalletConfig::default()
        };
        let store = SessionStore::new(&config);
        let first = store.get_or_create("alice");
        let mut guard = first.lock();
        guard.touch(Utc::now() - Duration::minutes(5));

        let second = store.get_or_create("alice");
        assert!(!second.created);
        assert!(Arc::ptr_eq(&first.handle, &second.handle));
        drop(guard);
    }

    #[test]
    fn delete_retires_and_removes() {
        let store = SessionStore::default();
        let slot = store.get_or_create("alice");
        assert!(store.delete("alice"));
        assert!(slot.lock().is_retired());
        assert!(store.snapshot("alice").is_none());
        assert!(!store.delete("alice"));
    }

    #[test]
    fn discard_leaves_a_newer_session_alone() {
        let store = SessionStore::default();
        let old = store.get_or_create("alice");
        old.lock().retire();
        let newer = store.get_or_create("alice");
        assert!(newer.created);

        store.discard("alice", &old.handle);
        assert_eq!(store.len(), 1);
        store.discard("alice", &newer.handle);
        assert!(store.is_empty());
    }

    #[test]
    fn periodic_sweep_drops_idle_sessions() {
        let config = WalletConfig {
            session_ttl_minutes: 1,
            ..WalletConfig::default()
        };
        let store = SessionStore::new(&config);
        let idle = store.get_or_create("idle");
        idle.lock().touch(Utc::now() - Duration::minutes(10));

        for n in 1..SWEEP_EVERY {
            store.get_or_create(&format!("user-{n}"));
        }
        assert!(store.snapshot("idle").is_none());
        assert_eq!(store.len() as u64, SWEEP_EVERY - 1);
    }

    #[test]
    fn distinct_identities_do_not_contend() {
        let store = Arc::new(SessionStore::default());
        let held = store.get_or_create("alice");
        let _guard = held.lock();

        let other = Arc::clone(&store);
        let handle = std::thread::spawn(move || {
            let slot = other.get_or_create("bob");
            let mut session = slot.lock();
            session.advance(Stage::VerifyPin);
            session.stage()
        });
        assert_eq!(handle.join().expect("bob finished"), Stage::VerifyPin);
    }
}

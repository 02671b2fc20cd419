//! In-memory per-session state.
//!
//! Sessions are keyed by the client-supplied `X-Session-ID` header and live
//! until an explicit cleanup or process exit. Nothing is persisted.

use super::throttle::RateLimiter;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;

/// Session key used when a request does not carry one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Execution state tracked for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Run attempts since the session was created, throttled ones included.
    pub invocation_count: u64,
    /// Time of the last admitted run (or creation).
    pub last_activity: DateTime<Utc>,
    /// Scratch file holding the latest submission. Allocated on first write.
    pub scratch_path: Option<PathBuf>,
}

impl Session {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            invocation_count: 0,
            last_activity: now,
            scratch_path: None,
        }
    }
}

/// Outcome of [`SessionStore::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Throttled,
}

/// Mutex-guarded session map shared by all request handlers.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Return a snapshot of the session, inserting a fresh one if absent.
    pub fn get_or_create(&self, id: &str) -> Session {
        let mut map = self.sessions.lock();
        map.entry(id.to_string())
            .or_insert_with(|| Session::new(Utc::now()))
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().get(id).cloned()
    }

    /// Count a run attempt and decide whether it may proceed.
    ///
    /// The counter is bumped for every attempt. The limiter sees the bumped
    /// count against the previous `last_activity`; only an admitted run moves
    /// `last_activity` forward.
    pub fn admit(&self, id: &str, limiter: &RateLimiter, now: DateTime<Utc>) -> Admission {
        let mut map = self.sessions.lock();
        let session = map
            .entry(id.to_string())
            .or_insert_with(|| Session::new(now));

        session.invocation_count += 1;
        if limiter.should_throttle(session, now) {
            return Admission::Throttled;
        }
        session.last_activity = now;
        Admission::Admitted
    }

    /// Return the session's scratch path, allocating one with `allocate` if the
    /// session has none yet. Allocation runs under the map lock so a session
    /// never ends up with two files.
    pub fn scratch_path_or_insert_with<E>(
        &self,
        id: &str,
        allocate: impl FnOnce() -> Result<PathBuf, E>,
    ) -> Result<PathBuf, E> {
        let mut map = self.sessions.lock();
        let session = map
            .entry(id.to_string())
            .or_insert_with(|| Session::new(Utc::now()));

        if let Some(path) = &session.scratch_path {
            return Ok(path.clone());
        }
        let path = allocate()?;
        session.scratch_path = Some(path.clone());
        Ok(path)
    }

    /// Delete the session. Returns whether one existed.
    pub fn remove(&self, id: &str) -> bool {
        self.sessions.lock().remove(id).is_some()
    }

    /// Remove every session, handing them back for file cleanup.
    pub fn drain(&self) -> Vec<(String, Session)> {
        self.sessions.lock().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[test]
    fn get_or_create_inserts_fresh_session() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let session = store.get_or_create("abc");
        assert_eq!(session.invocation_count, 0);
        assert!(session.scratch_path.is_none());
        assert_eq!(store.len(), 1);

        // second call returns the same entry rather than a new one
        store.get_or_create("abc");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_reports_existence() {
        let store = SessionStore::new();
        store.get_or_create("abc");
        assert!(store.remove("abc"));
        assert!(!store.remove("abc"));
        assert!(store.get("abc").is_none());
    }

    #[test]
    fn admit_counts_every_attempt() {
        let store = SessionStore::new();
        let limiter = RateLimiter::new(5.0);
        let t0 = Utc::now();

        assert_eq!(store.admit("s", &limiter, t0), Admission::Admitted);
        let session = store.get("s").unwrap();
        assert_eq!(session.invocation_count, 1);
        assert_eq!(session.last_activity, t0);
    }

    #[test]
    fn throttled_attempt_keeps_last_activity() {
        let store = SessionStore::new();
        let limiter = RateLimiter::new(5.0);
        let t0 = Utc::now();

        // Same instant: elapsed is zero, so every call is admitted.
        for _ in 0..6 {
            assert_eq!(store.admit("s", &limiter, t0), Admission::Admitted);
        }

        // 7 attempts over one second exceeds 5/s.
        let t1 = t0 + Duration::seconds(1);
        assert_eq!(store.admit("s", &limiter, t1), Admission::Throttled);

        let session = store.get("s").unwrap();
        assert_eq!(session.invocation_count, 7);
        assert_eq!(session.last_activity, t0);
    }

    #[test]
    fn admitted_attempt_moves_last_activity() {
        let store = SessionStore::new();
        let limiter = RateLimiter::new(5.0);
        let t0 = Utc::now();
        store.admit("s", &limiter, t0);

        let t1 = t0 + Duration::seconds(10);
        assert_eq!(store.admit("s", &limiter, t1), Admission::Admitted);
        assert_eq!(store.get("s").unwrap().last_activity, t1);
    }

    #[test]
    fn scratch_path_allocated_once() {
        let store = SessionStore::new();
        let mut calls = 0;
        let first = store
            .scratch_path_or_insert_with::<std::io::Error>("s", || {
                calls += 1;
                Ok(PathBuf::from("/tmp/one.py"))
            })
            .unwrap();
        let second = store
            .scratch_path_or_insert_with::<std::io::Error>("s", || {
                calls += 1;
                Ok(PathBuf::from("/tmp/two.py"))
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn failed_allocation_leaves_no_path() {
        let store = SessionStore::new();
        let result = store.scratch_path_or_insert_with("s", || {
            Err(std::io::Error::other("disk full"))
        });
        assert!(result.is_err());
        assert!(store.get("s").unwrap().scratch_path.is_none());
    }

    #[test]
    fn drain_empties_store() {
        let store = SessionStore::new();
        store.get_or_create("a");
        store.get_or_create("b");
        let mut ids: Vec<String> = store.drain().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_admits_keep_map_consistent() {
        let store = Arc::new(SessionStore::new());
        let limiter = Arc::new(RateLimiter::new(5.0));
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.admit("shared", &limiter, now);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("shared").unwrap().invocation_count, 400);
    }
}

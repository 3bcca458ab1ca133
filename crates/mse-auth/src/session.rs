//! Server-side sessions
//!
//! A session is an opaque random id mapped to a clinician until a fixed
//! expiry. The id travels in the session cookie (see [`crate::cookie`]).

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use mse_core::traits::Id;
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SESSION_ID_LENGTH: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store unavailable")]
    StoreUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Open a session for `user_id` lasting `lifetime_seconds`
    ///
    /// A lifetime past chrono's range expires at the latest representable time.
    pub fn new(user_id: Id, lifetime_seconds: i64) -> Self {
        let created_at = Utc::now();
        let expires_at = Duration::try_seconds(lifetime_seconds)
            .and_then(|lifetime| created_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: rand::rng()
                .sample_iter(Alphanumeric)
                .take(SESSION_ID_LENGTH)
                .map(char::from)
                .collect(),
            user_id,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Backend holding live sessions
///
/// `find` never returns an expired session.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: Session) -> Result<(), SessionError>;

    fn find(&self, session_id: &str) -> Result<Option<Session>, SessionError>;

    fn remove(&self, session_id: &str) -> Result<(), SessionError>;

    /// Drop sessions expired at `now`; returns how many were removed
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError>;
}

/// Process-local session store
///
/// Sessions are lost on restart, which logs every clinician out.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<String, Session>) -> T) -> Result<T, SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoreUnavailable)?;
        Ok(f(&mut sessions))
    }
}

impl SessionStore for MemorySessionStore {
    fn insert(&self, session: Session) -> Result<(), SessionError> {
        self.write(|sessions| {
            sessions.insert(session.id.clone(), session);
        })
    }

    fn find(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::StoreUnavailable)?;
        Ok(sessions
            .get(session_id)
            .filter(|session| !session.is_expired())
            .cloned())
    }

    fn remove(&self, session_id: &str) -> Result<(), SessionError> {
        self.write(|sessions| {
            sessions.remove(session_id);
        })
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        self.write(|sessions| {
            let before = sessions.len();
            sessions.retain(|_, session| !session.is_expired_at(now));
            before - sessions.len()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new(1, 3600);
        assert!(!session.is_expired());
        assert_eq!(session.user_id, 1);
        assert_eq!(session.id.len(), SESSION_ID_LENGTH);
        assert!(session.id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(session.id, Session::new(1, 3600).id);
    }

    #[test]
    fn test_huge_lifetime_does_not_overflow() {
        for lifetime in [i64::MAX, i64::MAX / 1000] {
            let session = Session::new(1, lifetime);
            assert!(!session.is_expired());
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let session = Session::new(1, 60);
        assert!(!session.is_expired_at(session.expires_at - Duration::seconds(1)));
        assert!(session.is_expired_at(session.expires_at));
    }

    #[test]
    fn test_memory_session_store() {
        let store = MemorySessionStore::new();
        let session = Session::new(1, 3600);
        let session_id = session.id.clone();

        store.insert(session).unwrap();
        assert_eq!(store.find(&session_id).unwrap().map(|s| s.user_id), Some(1));

        store.remove(&session_id).unwrap();
        assert!(store.find(&session_id).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_session_hidden_and_purged() {
        let store = MemorySessionStore::new();
        let expired = Session::new(2, -10);
        let expired_id = expired.id.clone();
        store.insert(expired).unwrap();
        store.insert(Session::new(3, 3600)).unwrap();

        assert!(store.find(&expired_id).unwrap().is_none());
        assert_eq!(store.purge_expired(Utc::now()).unwrap(), 1);
        assert_eq!(store.len(), 1);
    }
}

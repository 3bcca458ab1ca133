//! Login, logout and session resolution

use std::sync::Arc;

use chrono::Utc;
use mse_auth::{verify_password, CurrentUser, Session, SessionError, SessionStore};
use mse_core::{MseError, MseResult};
use mse_db::Stores;
use mse_models::Clinician;
use tracing::{debug, info, warn};

pub const INVALID_CREDENTIALS: &str = "Please enter a correct username and password.";

/// Default session lifetime in seconds (12 hours)
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;

fn session_error(err: SessionError) -> MseError {
    MseError::Internal(err.to_string())
}

pub struct AuthenticationService {
    stores: Stores,
    sessions: Arc<dyn SessionStore>,
    session_ttl_seconds: i64,
}

impl AuthenticationService {
    pub fn new(stores: Stores, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            stores,
            sessions,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    pub fn with_session_ttl(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    /// Verify credentials and open a session
    pub async fn login(&self, username: &str, password: &str) -> MseResult<(Clinician, Session)> {
        let clinician = self
            .stores
            .clinicians
            .find_by_username(username.trim())
            .await?;

        let clinician = match clinician {
            Some(c) if verify_password(password, &c.password_hash) => c,
            _ => {
                warn!(username, "Failed login attempt");
                return Err(MseError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        let session = self.start_session(&clinician)?;
        info!(clinician_id = clinician.id, "Clinician logged in");
        Ok((clinician, session))
    }

    /// Open a session for an already authenticated clinician
    ///
    /// Expired sessions are purged first.
    pub fn start_session(&self, clinician: &Clinician) -> MseResult<Session> {
        let purged = self
            .sessions
            .purge_expired(Utc::now())
            .map_err(session_error)?;
        if purged > 0 {
            debug!(purged, "Expired sessions purged");
        }

        let session = Session::new(clinician.id, self.session_ttl_seconds);
        self.sessions.insert(session.clone()).map_err(session_error)?;
        Ok(session)
    }

    pub fn logout(&self, session_id: &str) -> MseResult<()> {
        self.sessions.remove(session_id).map_err(session_error)?;
        debug!("Session closed");
        Ok(())
    }

    /// Caller identity for a session id, or `None` when the session is
    /// unknown, expired, or its clinician no longer exists
    pub async fn resolve(&self, session_id: &str) -> MseResult<Option<CurrentUser>> {
        let Some(session) = self.sessions.find(session_id).map_err(session_error)? else {
            return Ok(None);
        };

        let Some(clinician) = self.stores.clinicians.find_by_id(session.user_id).await? else {
            self.sessions.remove(session_id).map_err(session_error)?;
            return Ok(None);
        };

        Ok(Some(CurrentUser::from(&clinician)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_clinician;
    use mse_auth::{hash_password, MemorySessionStore};

    async fn setup() -> (AuthenticationService, Clinician) {
        let stores = Stores::in_memory();
        let mut new = new_clinician("doctor1", false);
        new.password_hash = hash_password("s3cure-pass").unwrap();
        let clinician = stores.clinicians.create(new).await.unwrap();
        let service = AuthenticationService::new(stores, Arc::new(MemorySessionStore::new()));
        (service, clinician)
    }

    #[tokio::test]
    async fn test_login_and_resolve() {
        let (service, clinician) = setup().await;

        let (logged_in, session) = service.login("doctor1", "s3cure-pass").await.unwrap();
        assert_eq!(logged_in.id, clinician.id);
        assert_eq!(session.user_id, clinician.id);

        let user = service.resolve(&session.id).await.unwrap().unwrap();
        assert_eq!(user.username, "doctor1");
        assert!(!user.is_superuser);

        service.logout(&session.id).unwrap();
        assert!(service.resolve(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let (service, _) = setup().await;

        for (username, password) in [("doctor1", "wrong"), ("nobody", "s3cure-pass")] {
            let err = service.login(username, password).await.unwrap_err();
            assert_eq!(err.status_code(), 401);
        }
    }

    #[tokio::test]
    async fn test_expired_session_not_resolved() {
        let (service, clinician) = setup().await;
        let service = service.with_session_ttl(-1);

        let session = service.start_session(&clinician).unwrap();
        assert!(service.resolve(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_session_purges_expired() {
        let (service, clinician) = setup().await;
        let sessions = Arc::new(MemorySessionStore::new());
        let expired = AuthenticationService::new(service.stores.clone(), sessions.clone())
            .with_session_ttl(-1);
        let live = AuthenticationService::new(service.stores.clone(), sessions.clone());

        expired.start_session(&clinician).unwrap();
        expired.start_session(&clinician).unwrap();
        assert_eq!(sessions.len(), 1);

        live.start_session(&clinician).unwrap();
        assert_eq!(sessions.len(), 1);
    }
}

#[cfg(test)]
#[path = "session_store_test.rs"]
mod tests;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tokio::sync::watch;

use crate::domain::models::ApiError;
use crate::domain::models::AuthError;
use crate::domain::models::AuthPayload;
use crate::domain::models::BookApiBox;
use crate::domain::models::LoginRequest;
use crate::domain::models::RegisterRequest;
use crate::domain::models::SecureStoreBox;
use crate::domain::models::Session;
use crate::domain::models::SessionHandle;
use crate::domain::models::User;

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";

/// Raises a flag for as long as it lives, so every exit path lowers it again.
struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> FlagGuard<'a> {
        flag.store(true, Ordering::SeqCst);
        return FlagGuard { flag };
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Owns the signed in user and their bearer token. It is the only writer of
/// the session; everything else reads it through a `SessionHandle`.
pub struct SessionStore {
    api: BookApiBox,
    storage: SecureStoreBox,
    session: watch::Sender<Option<Session>>,
    is_loading: AtomicBool,
    is_checking_auth: AtomicBool,
}

impl SessionStore {
    pub fn new(api: BookApiBox, storage: SecureStoreBox) -> SessionStore {
        let (session, _) = watch::channel(None);
        return SessionStore {
            api,
            storage,
            session,
            is_loading: AtomicBool::new(false),
            is_checking_auth: AtomicBool::new(false),
        };
    }

    /// Builds a store and restores any persisted session into it.
    pub async fn create(api: BookApiBox, storage: SecureStoreBox) -> SessionStore {
        let store = SessionStore::new(api, storage);
        store.restore().await;
        return store;
    }

    pub fn handle(&self) -> SessionHandle {
        return SessionHandle::new(self.session.subscribe());
    }

    pub fn session(&self) -> Option<Session> {
        return self.session.borrow().clone();
    }

    pub fn user(&self) -> Option<User> {
        return self
            .session
            .borrow()
            .as_ref()
            .map(|session| return session.user.clone());
    }

    pub fn token(&self) -> Option<String> {
        return self
            .session
            .borrow()
            .as_ref()
            .map(|session| return session.token.to_string());
    }

    /// True while a register or login request is in flight. Overlapping calls
    /// share the flag, so the first one to finish lowers it.
    pub fn is_loading(&self) -> bool {
        return self.is_loading.load(Ordering::SeqCst);
    }

    pub fn is_checking_auth(&self) -> bool {
        return self.is_checking_auth.load(Ordering::SeqCst);
    }

    /// Loads the persisted session. Returns whether one was found. Missing,
    /// half written or corrupt data, and storage failures, all end in "no
    /// session" with any leftovers cleared.
    pub async fn restore(&self) -> bool {
        let _checking = FlagGuard::raise(&self.is_checking_auth);

        match self.read_persisted().await {
            Ok(Some(session)) => {
                tracing::debug!(user_id = %session.user.id, "Restored session");
                self.session.send_replace(Some(session));
                return true;
            }
            Ok(None) => {
                tracing::debug!("No persisted session");
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to restore session");
                self.clear_persisted().await;
            }
        }

        self.session.send_replace(None);
        return false;
    }

    async fn read_persisted(&self) -> anyhow::Result<Option<Session>> {
        let token = self.storage.get(TOKEN_KEY).await?;
        let user = self.storage.get(USER_KEY).await?;

        return match (user, token) {
            (None, None) => Ok(None),
            (Some(user), Some(token)) if !token.is_empty() => {
                let user: User = serde_json::from_str(&user)?;
                Ok(Some(Session::new(user, token)))
            }
            _ => anyhow::bail!("Persisted session is incomplete"),
        };
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let _loading = FlagGuard::raise(&self.is_loading);
        let req = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        let res = self.api.register(&req).await;
        return self.complete_auth(res).await;
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _loading = FlagGuard::raise(&self.is_loading);
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let res = self.api.login(&req).await;
        return self.complete_auth(res).await;
    }

    async fn complete_auth(&self, res: Result<AuthPayload, ApiError>) -> Result<Session, AuthError> {
        let payload = match res {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "Authentication failed");
                return Err(AuthError::from(err));
            }
        };

        if let Some(message) = &payload.message {
            tracing::debug!(message = %message, "Authenticated");
        }

        let session = Session::new(payload.user, payload.token);
        self.session.send_replace(Some(session.clone()));
        self.persist(&session).await;

        return Ok(session);
    }

    /// Persistence failures after a successful login are logged and do not
    /// fail the login; the session stays active for this process.
    async fn persist(&self, session: &Session) {
        let user = match serde_json::to_string(&session.user) {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize user, session not persisted");
                return;
            }
        };

        if let Err(err) = self.storage.set(USER_KEY, &user).await {
            tracing::warn!(error = %err, "Failed to persist user");
        }
        if let Err(err) = self.storage.set(TOKEN_KEY, &session.token).await {
            tracing::warn!(error = %err, "Failed to persist token");
        }
    }

    async fn clear_persisted(&self) {
        if let Err(err) = self.storage.remove(USER_KEY).await {
            tracing::warn!(error = %err, "Failed to remove persisted user");
        }
        if let Err(err) = self.storage.remove(TOKEN_KEY).await {
            tracing::warn!(error = %err, "Failed to remove persisted token");
        }
    }

    /// Clears the session everywhere. Never fails: storage errors are logged
    /// and memory is cleared regardless.
    pub async fn logout(&self) {
        self.clear_persisted().await;
        self.session.send_replace(None);
        tracing::debug!("Logged out");
    }

    /// Tears the store down without touching persisted data. Handles see the
    /// session disappear.
    pub fn dispose(self) {
        self.session.send_replace(None);
    }
}

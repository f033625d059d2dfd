#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use tokio::sync::watch;

use super::User;

/// An authenticated identity. User and token only ever exist together, so a
/// missing session is modelled as `Option<Session>` rather than two optional
/// fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl Session {
    pub fn new(user: User, token: String) -> Session {
        return Session { user, token };
    }
}

/// Read-only view of the active session. Handed out by `SessionStore` to
/// everything that needs to authorize requests.
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionHandle {
    pub fn new(rx: watch::Receiver<Option<Session>>) -> SessionHandle {
        return SessionHandle { rx };
    }

    pub fn current(&self) -> Option<Session> {
        return self.rx.borrow().clone();
    }

    pub fn token(&self) -> Option<String> {
        return self
            .rx
            .borrow()
            .as_ref()
            .map(|session| return session.token.to_string());
    }

    pub fn is_authenticated(&self) -> bool {
        return self.rx.borrow().is_some();
    }

    /// Reports whether the session was replaced since the last call, and
    /// marks the current one as seen. Every replacement counts, including one
    /// that publishes the same token again.
    pub fn take_changed(&mut self) -> bool {
        if !self.rx.has_changed().unwrap_or(false) {
            return false;
        }

        self.rx.borrow_and_update();
        return true;
    }

    /// Resolves once the session is replaced, or errors when the owning store
    /// has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        return self.rx.changed().await;
    }
}

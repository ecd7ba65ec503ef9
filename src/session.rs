use crate::error::{FxgateError, Result};
use tokio::sync::RwLock;

/// Connection lifecycle of a gateway session.
///
/// `Connected` is reachable via fresh login or re-login; the transitions
/// themselves are driven by the adapter, this type only tracks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Shared view of the session state, written by the client and its event
/// pump, read by anyone.
pub struct SessionTracker {
    state: RwLock<SessionState>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::Disconnected),
        }
    }

    pub async fn get(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn set(&self, next: SessionState) {
        let mut state = self.state.write().await;
        if *state != next {
            tracing::debug!(from = ?*state, to = ?next, "session state change");
            *state = next;
        }
    }

    /// Fails unless a session is being established or is established.
    /// Correlated calls are meaningless against a dead transport.
    pub async fn require_active(&self) -> Result<()> {
        match self.get().await {
            SessionState::Connecting | SessionState::Connected => Ok(()),
            SessionState::Disconnected => {
                Err(FxgateError::Session("session is disconnected".into()))
            }
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

//! Session lifecycle state machine.

use tokio::task::AbortHandle;
use tracing::{info, warn};

/// Session states, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::ShuttingDown => "shutting-down",
        };
        write!(f, "{name}")
    }
}

/// Tracks one client connection from `initialize` through shutdown.
///
/// Transitions only move forward. The fallback promotion timer is armed by
/// the dispatcher; [`SessionLifecycle::fallback_promote`] is the named
/// transition it drives, and tests call it directly instead of waiting out
/// the clock.
#[derive(Debug, Default)]
pub struct SessionLifecycle {
    state: SessionState,
    protocol_version: Option<String>,
    fallback: Option<AbortHandle>,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// `initialize` received: Uninitialized → Initializing. A repeated
    /// initialize renegotiates the version but never moves the state back.
    pub fn begin_initialize(&mut self, protocol_version: String) {
        self.protocol_version = Some(protocol_version);
        if self.state == SessionState::Uninitialized {
            self.state = SessionState::Initializing;
        } else {
            warn!(state = %self.state, "initialize received again, keeping current state");
        }
    }

    /// Store the fallback timer's abort handle so `initialized` can cancel
    /// it.
    pub fn arm_fallback(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.fallback.replace(handle) {
            previous.abort();
        }
    }

    /// `initialized` notification: Initializing → Ready. Also promotes a
    /// session whose client skipped `initialize` entirely. Returns whether a
    /// transition happened.
    pub fn confirm_initialized(&mut self) -> bool {
        if let Some(timer) = self.fallback.take() {
            timer.abort();
        }
        match self.state {
            SessionState::Uninitialized | SessionState::Initializing => {
                self.state = SessionState::Ready;
                info!("session ready");
                true
            }
            SessionState::Ready | SessionState::ShuttingDown => false,
        }
    }

    /// The fallback timer fired with no `initialized` seen:
    /// Initializing → Ready. Returns whether the promotion happened.
    pub fn fallback_promote(&mut self) -> bool {
        self.fallback = None;
        if self.state == SessionState::Initializing {
            self.state = SessionState::Ready;
            return true;
        }
        false
    }

    /// Terminal transition; nothing moves after this.
    pub fn begin_shutdown(&mut self) {
        if let Some(timer) = self.fallback.take() {
            timer.abort();
        }
        self.state = SessionState::ShuttingDown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_handshake_path() {
        let mut session = SessionLifecycle::new();
        assert_eq!(session.state(), SessionState::Uninitialized);

        session.begin_initialize("2025-03-26".to_string());
        assert_eq!(session.state(), SessionState::Initializing);
        assert_eq!(session.protocol_version(), Some("2025-03-26"));

        assert!(session.confirm_initialized());
        assert!(session.is_ready());
        // A second confirmation is a no-op.
        assert!(!session.confirm_initialized());
    }

    #[test]
    fn fallback_promotes_only_from_initializing() {
        let mut session = SessionLifecycle::new();
        assert!(!session.fallback_promote(), "nothing to promote before initialize");

        session.begin_initialize("2024-11-05".to_string());
        assert!(session.fallback_promote());
        assert!(session.is_ready());

        assert!(!session.fallback_promote(), "ready already, timer is stale");
    }

    #[test]
    fn state_never_moves_backwards() {
        let mut session = SessionLifecycle::new();
        session.begin_initialize("2025-03-26".to_string());
        session.confirm_initialized();

        session.begin_initialize("2024-11-05".to_string());
        assert!(session.is_ready(), "re-initialize must not regress the state");
        assert_eq!(session.protocol_version(), Some("2024-11-05"));
    }

    #[test]
    fn shutdown_is_terminal() {
        let mut session = SessionLifecycle::new();
        session.begin_initialize("2025-03-26".to_string());
        session.begin_shutdown();
        assert_eq!(session.state(), SessionState::ShuttingDown);

        assert!(!session.confirm_initialized());
        assert!(!session.fallback_promote());
        assert_eq!(session.state(), SessionState::ShuttingDown);
    }

    #[tokio::test]
    async fn confirm_cancels_the_armed_timer() {
        let mut session = SessionLifecycle::new();
        session.begin_initialize("2025-03-26".to_string());

        let timer = tokio::spawn(std::future::pending::<()>());
        session.arm_fallback(timer.abort_handle());
        assert!(session.confirm_initialized());

        let join = timer.await;
        assert!(join.unwrap_err().is_cancelled());
    }
}

//! The client-visible connectivity state machine.
//!
//! `idle -> connecting -> ready -> transientFailure -> shutdown`, with
//! `transientFailure` looping back to `connecting` on retry and `ready`
//! able to drop straight back to `connecting` on a lost connection.
//! `shutdown` is terminal.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    Shutdown,
}

impl ConnectivityState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Whether `self -> next` is a legal edge in the documented diagram.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ConnectivityState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Ready)
                | (Connecting, TransientFailure)
                | (Ready, TransientFailure)
                | (Ready, Connecting)
                | (Ready, Idle)
                | (TransientFailure, Connecting)
                | (_, Shutdown)
        )
    }
}

/// A broadcastable connectivity state, watchable from any number of
/// callers awaiting readiness (e.g. a `wait_for_ready` call).
pub struct ConnectivityTracker {
    tx: watch::Sender<ConnectivityState>,
}

impl ConnectivityTracker {
    pub fn new() -> (Self, watch::Receiver<ConnectivityState>) {
        let (tx, rx) = watch::channel(ConnectivityState::Idle);
        (Self { tx }, rx)
    }

    pub fn current(&self) -> ConnectivityState {
        *self.tx.borrow()
    }

    /// Transitions to `next` if the edge is legal, returning whether it
    /// took effect. Illegal edges are silently ignored rather than
    /// panicking, since they can arise from races between a connect
    /// attempt and a concurrent shutdown.
    pub fn transition(&self, next: ConnectivityState) -> bool {
        let current = self.current();
        if current.is_terminal() || !current.can_transition_to(next) {
            return false;
        }
        let _ = self.tx.send(next);
        true
    }

    /// Resolves once the state reaches `Ready` or `Shutdown` (whichever
    /// comes first), for a caller awaiting readiness.
    pub async fn wait_ready_or_shutdown(&self, mut rx: watch::Receiver<ConnectivityState>) -> ConnectivityState {
        loop {
            let state = *rx.borrow();
            if matches!(state, ConnectivityState::Ready | ConnectivityState::Shutdown) {
                return state;
            }
            if rx.changed().await.is_err() {
                return ConnectivityState::Shutdown;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_edges_follow_the_documented_diagram() {
        use ConnectivityState::*;
        assert!(Idle.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Ready));
        assert!(Connecting.can_transition_to(TransientFailure));
        assert!(Ready.can_transition_to(TransientFailure));
        assert!(TransientFailure.can_transition_to(Connecting));
        assert!(Ready.can_transition_to(Shutdown));
        assert!(Ready.can_transition_to(Idle));
        assert!(!Idle.can_transition_to(Ready));
        assert!(!Shutdown.can_transition_to(Connecting));
    }

    #[test]
    fn shutdown_is_terminal_and_rejects_further_transitions() {
        let (tracker, _rx) = ConnectivityTracker::new();
        assert!(tracker.transition(ConnectivityState::Connecting));
        assert!(tracker.transition(ConnectivityState::Ready));
        assert!(tracker.transition(ConnectivityState::Shutdown));
        assert!(!tracker.transition(ConnectivityState::Connecting));
        assert_eq!(tracker.current(), ConnectivityState::Shutdown);
    }

    #[tokio::test]
    async fn wait_ready_or_shutdown_resolves_on_ready() {
        let (tracker, rx) = ConnectivityTracker::new();
        tracker.transition(ConnectivityState::Connecting);
        tracker.transition(ConnectivityState::Ready);
        let state = tracker.wait_ready_or_shutdown(rx).await;
        assert_eq!(state, ConnectivityState::Ready);
    }
}

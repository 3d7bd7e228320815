//! Events processed by the coordinator task.

use super::realtime::{ChannelActivity, PushMessage};
use super::state::PushStatus;
use crate::error::PushError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use superfeed_model::Permission;
use tokio::sync::oneshot;

/// Holds the toggle in-flight flag for as long as a toggle is queued or
/// running. Travels inside [`PushEvent::Toggle`], so the flag clears only
/// when the coordinator drops the event (or the event is never delivered).
#[derive(Debug)]
pub struct ToggleTicket(Arc<AtomicBool>);

impl ToggleTicket {
    /// Take the flag, or `None` if another toggle holds it.
    pub(super) fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for ToggleTicket {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Why the coordinator is re-deriving state from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileReason {
    Mount,
    Visible,
    AuthChanged,
    Requested,
}

impl ReconcileReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileReason::Mount => "mount",
            ReconcileReason::Visible => "visible",
            ReconcileReason::AuthChanged => "auth_changed",
            ReconcileReason::Requested => "requested",
        }
    }
}

/// Events sent to the coordinator task.
#[derive(Debug)]
pub enum PushEvent {
    Reconcile {
        reason: ReconcileReason,
        reply_tx: Option<oneshot::Sender<PushStatus>>,
    },
    RequestPermission {
        reply_tx: oneshot::Sender<Result<Permission, PushError>>,
    },
    Toggle {
        enable: bool,
        ticket: ToggleTicket,
        reply_tx: oneshot::Sender<Result<PushStatus, PushError>>,
    },
    VisibilityChanged {
        visible: bool,
    },
    /// `None` means signed out.
    AuthChanged {
        user: Option<String>,
    },
    ServiceWorkerMessage(PushMessage),
    RealtimeActivity(ChannelActivity),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_is_exclusive_until_dropped() {
        let flag = Arc::new(AtomicBool::new(false));
        let ticket = ToggleTicket::acquire(&flag).unwrap();
        assert!(ToggleTicket::acquire(&flag).is_none());
        drop(ticket);
        assert!(!flag.load(Ordering::Acquire));
        assert!(ToggleTicket::acquire(&flag).is_some());
    }
}

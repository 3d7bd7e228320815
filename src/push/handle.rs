//! UI-facing handle to the coordinator task.

use super::realtime::{ChannelActivity, PushMessage};
use super::state::PushStatus;
use super::types::{PushEvent, ReconcileReason, ToggleTicket};
use crate::error::PushError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use superfeed_model::Permission;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Cloneable context object for the UI.
///
/// Reads (`status()` and friends) never touch the task. Every other call is
/// queued as a [`PushEvent`] and fails with [`PushError::CoordinatorGone`]
/// once the coordinator has shut down.
#[derive(Debug, Clone)]
pub struct PushHandle {
    tx: mpsc::Sender<PushEvent>,
    status_rx: watch::Receiver<PushStatus>,
    toggle_in_flight: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl PushHandle {
    pub(super) fn new(
        tx: mpsc::Sender<PushEvent>,
        status_rx: watch::Receiver<PushStatus>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            tx,
            status_rx,
            toggle_in_flight: Arc::new(AtomicBool::new(false)),
            shutdown,
        }
    }

    /// Last published status.
    pub fn status(&self) -> PushStatus {
        self.status_rx.borrow().clone()
    }

    /// Effective "notifications enabled".
    pub fn enabled(&self) -> bool {
        self.status_rx.borrow().enabled
    }

    pub fn permission(&self) -> Permission {
        self.status_rx.borrow().permission
    }

    pub fn has_active_subscription(&self) -> bool {
        self.status_rx.borrow().has_active_subscription
    }

    /// Receiver that wakes on every status change.
    pub fn watch_status(&self) -> watch::Receiver<PushStatus> {
        self.status_rx.clone()
    }

    /// Whether a toggle is queued or running.
    pub fn is_busy(&self) -> bool {
        self.toggle_in_flight.load(Ordering::Acquire)
    }

    /// Prompt for notification permission.
    pub async fn request_permission(&self) -> Result<Permission, PushError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PushEvent::RequestPermission { reply_tx }).await?;
        reply_rx.await.map_err(|_| PushError::CoordinatorGone)?
    }

    /// Enable or disable notifications.
    ///
    /// Returns [`PushError::Busy`] if another toggle from any clone of this
    /// handle is still queued or running. Dropping the returned future does
    /// not cancel a toggle that was already queued; it stays busy until the
    /// coordinator is done with it.
    pub async fn toggle(&self, enable: bool) -> Result<PushStatus, PushError> {
        let ticket = ToggleTicket::acquire(&self.toggle_in_flight).ok_or(PushError::Busy)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PushEvent::Toggle {
            enable,
            ticket,
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| PushError::CoordinatorGone)?
    }

    /// Re-derive state from scratch and return the result.
    pub async fn reconcile(&self) -> Result<PushStatus, PushError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PushEvent::Reconcile {
            reason: ReconcileReason::Requested,
            reply_tx: Some(reply_tx),
        })
        .await?;
        reply_rx.await.map_err(|_| PushError::CoordinatorGone)
    }

    pub async fn visibility_changed(&self, visible: bool) -> Result<(), PushError> {
        self.send(PushEvent::VisibilityChanged { visible }).await
    }

    /// The authenticated user changed; `None` signs out.
    pub async fn auth_changed(&self, user: Option<String>) -> Result<(), PushError> {
        self.send(PushEvent::AuthChanged { user }).await
    }

    pub async fn signed_out(&self) -> Result<(), PushError> {
        self.auth_changed(None).await
    }

    pub async fn service_worker_message(&self, message: PushMessage) -> Result<(), PushError> {
        self.send(PushEvent::ServiceWorkerMessage(message)).await
    }

    pub async fn realtime_activity(&self, activity: ChannelActivity) -> Result<(), PushError> {
        self.send(PushEvent::RealtimeActivity(activity)).await
    }

    /// Stop the coordinator. An operation already running finishes, but its
    /// result is not published.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    async fn send(&self, event: PushEvent) -> Result<(), PushError> {
        if self.shutdown.is_cancelled() {
            return Err(PushError::CoordinatorGone);
        }
        self.tx
            .send(event)
            .await
            .map_err(|_| PushError::CoordinatorGone)
    }
}

//! The push coordinator task.
//!
//! Owns every piece of push state and processes [`PushEvent`]s one at a time,
//! so enable/disable steps can never interleave. Each external call is
//! checked on its own; a failure ends the current operation, is reported as a
//! toast, and leaves the state reflecting what was actually observed.

use super::handle::PushHandle;
use super::platform::{
    PlatformNotification, PushPlatform, ServiceWorkerRegistration, SubscriptionBackend,
};
use super::state::PushStatus;
use super::types::{PushEvent, ReconcileReason};
use super::{Notice, NoticeLevel};
use crate::config::{PushConfig, decode_server_key};
use crate::error::PushError;
use crate::metrics;
use crate::telemetry::{OperationTimer, spans};
use chrono::Utc;
use std::sync::Arc;
use superfeed_model::{Permission, PushSubscription, ServerRecord};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

/// Single-task push subscription state machine.
pub struct PushCoordinator {
    platform: Arc<dyn PushPlatform>,
    backend: Arc<dyn SubscriptionBackend>,
    config: PushConfig,
    server_key: Option<Vec<u8>>,

    user: Option<String>,
    supported: bool,
    unsupported_reported: bool,
    permission: Permission,
    subscription: Option<PushSubscription>,
    record: Option<ServerRecord>,
    visible: bool,

    status_tx: watch::Sender<PushStatus>,
    notices: mpsc::Sender<Notice>,
    shutdown: CancellationToken,
}

impl PushCoordinator {
    /// Spawn the coordinator on the current Tokio runtime.
    ///
    /// State is reconciled once on mount before any queued event is handled.
    pub fn spawn(
        platform: Arc<dyn PushPlatform>,
        backend: Arc<dyn SubscriptionBackend>,
        config: PushConfig,
        user: Option<String>,
    ) -> (PushHandle, mpsc::Receiver<Notice>) {
        let depth = config.queue_depth.max(1);
        let (tx, rx) = mpsc::channel(depth);
        let (notice_tx, notice_rx) = mpsc::channel(depth);

        let supported = platform.is_supported();
        let (status_tx, status_rx) = watch::channel(PushStatus::new(
            supported,
            Permission::Default,
            None,
            None,
            user.as_deref(),
        ));
        let shutdown = CancellationToken::new();

        let coordinator = Self {
            server_key: usable_server_key(config.application_server_key.as_deref()),
            visible: platform.is_visible(),
            platform,
            backend,
            config,
            user,
            supported,
            unsupported_reported: false,
            permission: Permission::Default,
            subscription: None,
            record: None,
            status_tx,
            notices: notice_tx,
            shutdown: shutdown.clone(),
        };

        tokio::spawn(coordinator.run(rx));

        (PushHandle::new(tx, status_rx, shutdown), notice_rx)
    }

    /// The main coordinator loop.
    async fn run(mut self, mut rx: mpsc::Receiver<PushEvent>) {
        let shutdown = self.shutdown.clone();
        self.reconcile(ReconcileReason::Mount).await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }

        debug!("Push coordinator stopped");
    }

    async fn handle_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::Reconcile { reason, reply_tx } => {
                self.reconcile(reason).await;
                if let Some(reply_tx) = reply_tx {
                    let _ = reply_tx.send(self.current_status());
                }
            }
            PushEvent::RequestPermission { reply_tx } => {
                let result = self.request_permission().await;
                let _ = reply_tx.send(result);
            }
            PushEvent::Toggle {
                enable,
                ticket,
                reply_tx,
            } => {
                let result = self.toggle(enable).await;
                // Release before replying so the caller never sees itself busy.
                drop(ticket);
                let _ = reply_tx.send(result);
            }
            PushEvent::VisibilityChanged { visible } => {
                let regained = visible && !self.visible;
                self.visible = visible;
                if regained {
                    self.reconcile(ReconcileReason::Visible).await;
                }
            }
            PushEvent::AuthChanged { user } => {
                if user.is_none() {
                    self.sign_out();
                } else {
                    self.user = user;
                    self.record = None;
                    self.reconcile(ReconcileReason::AuthChanged).await;
                }
            }
            PushEvent::ServiceWorkerMessage(message) => {
                let notification = message
                    .into_notification(&self.config.notification_title, self.config.icon.clone());
                self.show_notification(notification).await;
            }
            PushEvent::RealtimeActivity(activity) => {
                let notification = activity.into_notification(self.config.icon.clone());
                self.show_notification(notification).await;
            }
        }
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    async fn reconcile(&mut self, reason: ReconcileReason) {
        let span = spans::push_operation("reconcile", self.user.as_deref());
        self.reconcile_inner(reason).instrument(span).await;
    }

    /// Re-read permission, browser subscription and server record from
    /// scratch. Nothing cached is trusted.
    async fn reconcile_inner(&mut self, reason: ReconcileReason) {
        if !self.supported {
            self.report_unsupported();
            self.publish();
            return;
        }

        self.permission = self.platform.permission().await;

        match self.platform.service_worker().await {
            Some(registration) => match self.platform.get_subscription(&registration).await {
                Ok(subscription) => self.subscription = subscription,
                Err(e) => warn!(error = %e, "Failed to read push subscription, keeping last known"),
            },
            None => self.subscription = None,
        }

        match self.user.clone() {
            Some(user) => match self.backend.fetch_record(&user).await {
                Ok(record) => self.record = Some(record),
                Err(e) => {
                    warn!(error = %e, "Failed to fetch subscription record, keeping last known");
                    self.report_error(&PushError::Fetch(e));
                }
            },
            None => self.record = None,
        }

        self.publish();
        debug!(
            reason = reason.as_str(),
            state = self.current_status().state.as_str(),
            "Push state reconciled"
        );
    }

    fn sign_out(&mut self) {
        info!(user = ?self.user, "Signed out, resetting push state");
        self.user = None;
        self.record = None;
        self.subscription = None;
        self.publish();
    }

    // ========================================================================
    // Operations
    // ========================================================================

    async fn request_permission(&mut self) -> Result<Permission, PushError> {
        if !self.supported {
            self.report_unsupported();
            return Err(PushError::Unsupported);
        }

        let span = spans::push_operation("request_permission", self.user.as_deref());
        let _timer = OperationTimer::new("request_permission");
        let result = self
            .platform
            .request_permission()
            .instrument(span)
            .await
            .map_err(PushError::Permission);

        match &result {
            Ok(permission) => {
                self.permission = *permission;
                metrics::record_push_operation("request_permission", "ok");
            }
            Err(e) => {
                metrics::record_push_operation("request_permission", e.error_code());
                self.report_error(e);
            }
        }
        self.publish();
        result
    }

    async fn toggle(&mut self, enable: bool) -> Result<PushStatus, PushError> {
        let operation = if enable { "enable" } else { "disable" };
        let span = spans::push_operation(operation, self.user.as_deref());
        let timer = OperationTimer::new(operation);

        let result = if enable {
            self.enable().instrument(span).await
        } else {
            self.disable().instrument(span).await
        };
        drop(timer);

        match &result {
            Ok(()) => {
                metrics::record_push_operation(operation, "ok");
                info!(operation, user = ?self.user, "Push preference updated");
                let message = if enable {
                    "Notifications enabled"
                } else {
                    "Notifications disabled"
                };
                self.notify(Notice::toast(NoticeLevel::Success, message));
            }
            Err(e) => {
                metrics::record_push_operation(operation, e.error_code());
                warn!(
                    operation,
                    error = %e,
                    retryable = e.is_transient(),
                    "Push operation failed"
                );
                self.report_error(e);
            }
        }

        self.publish();
        result.map(|()| self.current_status())
    }

    async fn enable(&mut self) -> Result<(), PushError> {
        if !self.supported {
            return Err(PushError::Unsupported);
        }
        let user = self.user.clone().ok_or(PushError::NotSignedIn)?;
        let key = self.server_key.clone().ok_or(PushError::MissingServerKey)?;

        self.permission = self.platform.permission().await;
        if !self.permission.is_granted() {
            self.permission = self
                .platform
                .request_permission()
                .await
                .map_err(PushError::Permission)?;
            if !self.permission.is_granted() {
                return Err(PushError::PermissionDenied(self.permission));
            }
        }

        let registration = self.registration().await?;

        // Whatever is there goes first, even if it looks like ours: it may
        // belong to an account that signed in earlier on this browser.
        let existing = self
            .platform
            .get_subscription(&registration)
            .await
            .map_err(PushError::Subscribe)?;
        if let Some(old) = existing {
            self.platform
                .unsubscribe(&registration, &old)
                .await
                .map_err(PushError::Unsubscribe)?;
            self.subscription = None;
            debug!(endpoint = %old.endpoint, "Removed previous push subscription");
            self.retire_endpoint(&user, &old.endpoint).await;
        }

        let subscription = self
            .platform
            .subscribe(&registration, &key)
            .await
            .map_err(PushError::Subscribe)?;
        self.subscription = Some(subscription.clone());

        self.backend
            .upsert_subscription(&user, &subscription, true)
            .await
            .map_err(PushError::Persist)?;
        self.record
            .get_or_insert_with(ServerRecord::default)
            .upsert(subscription, true, Utc::now());

        self.backend
            .set_account_preference(&user, true)
            .await
            .map_err(PushError::Persist)?;
        if let Some(record) = self.record.as_mut() {
            record.enabled = true;
        }

        Ok(())
    }

    async fn disable(&mut self) -> Result<(), PushError> {
        let user = self.user.clone().ok_or(PushError::NotSignedIn)?;

        if self.supported {
            match self.platform.service_worker().await {
                Some(registration) => {
                    let existing = self
                        .platform
                        .get_subscription(&registration)
                        .await
                        .map_err(PushError::Unsubscribe)?;
                    if let Some(subscription) = existing {
                        self.platform
                            .unsubscribe(&registration, &subscription)
                            .await
                            .map_err(PushError::Unsubscribe)?;
                        self.subscription = None;

                        let known = self
                            .backend
                            .set_subscription_enabled(&user, &subscription.endpoint, false)
                            .await
                            .map_err(PushError::Persist)?;
                        if known && let Some(record) = self.record.as_mut() {
                            record.set_enabled(&subscription.endpoint, false, Utc::now());
                        }
                    }
                }
                None => self.subscription = None,
            }
        }

        self.backend
            .set_account_preference(&user, false)
            .await
            .map_err(PushError::Persist)?;
        if let Some(record) = self.record.as_mut() {
            record.enabled = false;
        }

        Ok(())
    }

    async fn registration(&self) -> Result<ServiceWorkerRegistration, PushError> {
        match self.platform.service_worker().await {
            Some(registration) => Ok(registration),
            None => self
                .platform
                .register_service_worker()
                .await
                .map_err(PushError::Registration),
        }
    }

    /// Mark an endpoint we just unsubscribed as disabled, if this user's
    /// record has it. Best effort: the new subscription matters more.
    async fn retire_endpoint(&mut self, user: &str, endpoint: &str) {
        if self.record.as_ref().and_then(|r| r.find(endpoint)).is_none() {
            return;
        }
        match self
            .backend
            .set_subscription_enabled(user, endpoint, false)
            .await
        {
            Ok(_) => {
                if let Some(record) = self.record.as_mut() {
                    record.set_enabled(endpoint, false, Utc::now());
                }
            }
            Err(e) => warn!(endpoint, error = %e, "Failed to disable previous endpoint"),
        }
    }

    /// Visible tab: in-app only. Hidden tab: platform notification, if
    /// permitted.
    async fn show_notification(&mut self, notification: PlatformNotification) {
        if self.visible {
            metrics::record_notification("toast");
            self.notify(Notice::InApp(notification));
            return;
        }

        if !self.supported || !self.permission.is_granted() {
            metrics::record_notification("dropped");
            debug!(
                title = %notification.title,
                permission = %self.permission,
                "Dropping notification for hidden tab"
            );
            return;
        }

        match self.platform.show_notification(notification).await {
            Ok(()) => metrics::record_notification("platform"),
            Err(e) => {
                metrics::record_notification("failed");
                warn!(error = %e, "Failed to show platform notification");
            }
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn current_status(&self) -> PushStatus {
        PushStatus::new(
            self.supported,
            self.permission,
            self.subscription.as_ref(),
            self.record.as_ref(),
            self.user.as_deref(),
        )
    }

    fn publish(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let status = self.current_status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    fn notify(&self, notice: Notice) {
        if self.shutdown.is_cancelled() {
            return;
        }
        match self.notices.try_send(notice) {
            Ok(()) => {}
            Err(TrySendError::Full(notice)) => {
                warn!(?notice, "Notice queue full, dropping");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    fn report_error(&mut self, error: &PushError) {
        if matches!(error, PushError::Unsupported) {
            self.report_unsupported();
        } else {
            self.notify(error.to_notice());
        }
    }

    fn report_unsupported(&mut self) {
        if !self.unsupported_reported {
            self.unsupported_reported = true;
            self.notify(PushError::Unsupported.to_notice());
        }
    }
}

/// Decoded key, or `None` when it is absent, empty or undecodable.
fn usable_server_key(key: Option<&str>) -> Option<Vec<u8>> {
    match decode_server_key(key?) {
        Ok(bytes) if bytes.is_empty() => None,
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(error = %e, "Ignoring undecodable application server key");
            None
        }
    }
}

//! Push subscription coordination.
//!
//! The coordinator reconciles three independent sources of truth into one
//! "notifications enabled" signal:
//!
//! - the platform notification permission,
//! - the browser's current push subscription,
//! - the server-held subscription record for the signed-in user.
//!
//! # Architecture
//!
//! - **State Ownership**: [`PushCoordinator`] owns all coordinator state and
//!   runs on its own Tokio task.
//! - **Message Passing**: the UI talks to it through a cloneable
//!   [`PushHandle`], which turns calls into [`PushEvent`]s.
//! - **Status**: every change is published on a watch channel, so UI readers
//!   never wait on the task.
//! - **Notices**: toasts and visible-tab notifications go out on a bounded
//!   [`Notice`] receiver returned from [`PushCoordinator::spawn`].

mod coordinator;
mod handle;
pub mod memory;
mod platform;
pub mod realtime;
mod state;
mod types;

pub use coordinator::PushCoordinator;
pub use handle::PushHandle;
pub use platform::{
    BackendError, PlatformError, PlatformNotification, PushPlatform, ServiceWorkerRegistration,
    SubscriptionBackend,
};
pub use realtime::{ChangeEvent, ChangeFilter, ChangeKind, ChannelActivity, PushMessage};
pub use state::{PushState, PushStatus, derive_state};
pub use types::{PushEvent, ReconcileReason, ToggleTicket};

use serde::Serialize;

/// Severity of a transient user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Something the UI should show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Dismissible status message.
    Toast { level: NoticeLevel, message: String },
    /// Channel activity that arrived while the tab was visible.
    InApp(PlatformNotification),
}

impl Notice {
    pub fn toast(level: NoticeLevel, message: impl Into<String>) -> Self {
        Notice::Toast {
            level,
            message: message.into(),
        }
    }
}

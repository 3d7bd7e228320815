//! Unified error handling for the push coordinator.
//!
//! Every external call the coordinator makes is independently failable. Each
//! failure halts the operation that made it, is labeled for metrics through
//! [`PushError::error_code`], and is rendered for the user through
//! [`PushError::to_notice`].

use crate::push::{BackendError, Notice, NoticeLevel, PlatformError};
use superfeed_model::Permission;
use thiserror::Error;

/// Errors returned by coordinator operations.
#[derive(Debug, Clone, Error)]
pub enum PushError {
    /// No service worker or push manager on this platform.
    #[error("push notifications are not supported on this platform")]
    Unsupported,

    #[error("not signed in")]
    NotSignedIn,

    #[error("no application server key configured")]
    MissingServerKey,

    /// The user declined (or previously blocked) notifications.
    #[error("notification permission is {0}")]
    PermissionDenied(Permission),

    #[error("permission request failed: {0}")]
    Permission(PlatformError),

    #[error("service worker registration failed: {0}")]
    Registration(PlatformError),

    #[error("subscribe failed: {0}")]
    Subscribe(PlatformError),

    #[error("unsubscribe failed: {0}")]
    Unsubscribe(PlatformError),

    #[error("failed to save subscription: {0}")]
    Persist(BackendError),

    #[error("failed to fetch subscription record: {0}")]
    Fetch(BackendError),

    /// Another toggle is queued or running.
    #[error("another notification change is in progress")]
    Busy,

    /// The coordinator task has shut down.
    #[error("push coordinator is gone")]
    CoordinatorGone,
}

impl PushError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::NotSignedIn => "not_signed_in",
            Self::MissingServerKey => "missing_server_key",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Permission(_) => "permission_error",
            Self::Registration(_) => "registration_error",
            Self::Subscribe(_) => "subscribe_error",
            Self::Unsubscribe(_) => "unsubscribe_error",
            Self::Persist(_) => "persist_error",
            Self::Fetch(_) => "fetch_error",
            Self::Busy => "busy",
            Self::CoordinatorGone => "coordinator_gone",
        }
    }

    /// Whether retrying the same action later can succeed without the user
    /// changing anything outside the app.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Permission(_)
                | Self::Registration(_)
                | Self::Subscribe(_)
                | Self::Unsubscribe(_)
                | Self::Persist(_)
                | Self::Fetch(_)
                | Self::Busy
        )
    }

    /// Convert to the transient message shown to the user.
    pub fn to_notice(&self) -> Notice {
        let (level, message) = match self {
            Self::Unsupported => (
                NoticeLevel::Warning,
                "Notifications are not supported in this browser.",
            ),
            Self::NotSignedIn => (NoticeLevel::Error, "Sign in to manage notifications."),
            Self::MissingServerKey => (
                NoticeLevel::Error,
                "Notifications are not available right now.",
            ),
            Self::PermissionDenied(Permission::Denied) => (
                NoticeLevel::Warning,
                "Notifications are blocked. Allow them in your browser settings.",
            ),
            Self::PermissionDenied(_) => (
                NoticeLevel::Info,
                "Notification permission was not granted.",
            ),
            Self::Busy => (
                NoticeLevel::Info,
                "Please wait for the current change to finish.",
            ),
            Self::CoordinatorGone => return Notice::toast(NoticeLevel::Error, self.to_string()),
            Self::Permission(_)
            | Self::Registration(_)
            | Self::Subscribe(_)
            | Self::Unsubscribe(_)
            | Self::Persist(_)
            | Self::Fetch(_) => (
                NoticeLevel::Error,
                "Could not update notification settings. Please try again.",
            ),
        };
        Notice::toast(level, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_distinct() {
        let errors = [
            PushError::Unsupported,
            PushError::NotSignedIn,
            PushError::MissingServerKey,
            PushError::PermissionDenied(Permission::Denied),
            PushError::Permission(PlatformError::Unavailable("x".into())),
            PushError::Registration(PlatformError::Unavailable("x".into())),
            PushError::Subscribe(PlatformError::Failed("x".into())),
            PushError::Unsubscribe(PlatformError::Failed("x".into())),
            PushError::Persist(BackendError::Network("x".into())),
            PushError::Fetch(BackendError::Network("x".into())),
            PushError::Busy,
            PushError::CoordinatorGone,
        ];
        let mut codes: Vec<_> = errors.iter().map(PushError::error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn denied_permission_is_not_transient() {
        assert!(!PushError::PermissionDenied(Permission::Denied).is_transient());
        assert!(!PushError::Unsupported.is_transient());
        assert!(PushError::Persist(BackendError::Network("timeout".into())).is_transient());
    }

    #[test]
    fn notices_point_at_browser_settings_when_blocked() {
        match PushError::PermissionDenied(Permission::Denied).to_notice() {
            Notice::Toast { level, message } => {
                assert_eq!(level, NoticeLevel::Warning);
                assert!(message.contains("browser settings"));
            }
            other => panic!("expected toast, got {other:?}"),
        }
        match PushError::Subscribe(PlatformError::Failed("boom".into())).to_notice() {
            Notice::Toast { level, .. } => assert_eq!(level, NoticeLevel::Error),
            other => panic!("expected toast, got {other:?}"),
        }
    }
}

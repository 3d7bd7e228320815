//! Derived push state.
//!
//! The state is never stored on its own; it is recomputed from the three
//! observed inputs every time one of them may have changed.

use serde::Serialize;
use superfeed_model::{Permission, PushSubscription, ServerRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushState {
    /// No service worker or push manager. Terminal.
    Unsupported,
    /// Permission is `default` or `denied`.
    NoPermission,
    /// Permission granted, but no local subscription that the server has
    /// enabled.
    PermissionGrantedNoSubscription,
    /// Permission granted and the local endpoint is enabled server-side.
    Active,
    /// Permission granted and a local subscription exists that the current
    /// user's record does not know about.
    Orphaned,
}

impl PushState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushState::Unsupported => "unsupported",
            PushState::NoPermission => "no_permission",
            PushState::PermissionGrantedNoSubscription => "permission_granted_no_subscription",
            PushState::Active => "active",
            PushState::Orphaned => "orphaned",
        }
    }
}

/// Compute the state from observed inputs.
///
/// Permission is the hard ceiling: nothing else is consulted unless it is
/// granted. A missing record (signed out, or never fetched) is treated as
/// empty. An endpoint present in the record but disabled there is
/// `PermissionGrantedNoSubscription`, not `Active`.
pub fn derive_state(
    supported: bool,
    permission: Permission,
    subscription: Option<&PushSubscription>,
    record: Option<&ServerRecord>,
) -> PushState {
    if !supported {
        return PushState::Unsupported;
    }
    if !permission.is_granted() {
        return PushState::NoPermission;
    }
    let Some(subscription) = subscription else {
        return PushState::PermissionGrantedNoSubscription;
    };
    match record.and_then(|r| r.find(&subscription.endpoint)) {
        Some(entry) if entry.enabled => PushState::Active,
        Some(_) => PushState::PermissionGrantedNoSubscription,
        None => PushState::Orphaned,
    }
}

/// Snapshot exposed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushStatus {
    pub state: PushState,
    pub permission: Permission,
    /// Effective "notifications enabled": true only in [`PushState::Active`].
    pub enabled: bool,
    /// Whether the browser currently holds a push subscription.
    pub has_active_subscription: bool,
    pub user: Option<String>,
}

impl PushStatus {
    pub fn new(
        supported: bool,
        permission: Permission,
        subscription: Option<&PushSubscription>,
        record: Option<&ServerRecord>,
        user: Option<&str>,
    ) -> Self {
        let state = derive_state(supported, permission, subscription, record);
        Self {
            state,
            permission,
            enabled: state == PushState::Active,
            has_active_subscription: subscription.is_some(),
            user: user.map(str::to_string),
        }
    }
}

impl Default for PushStatus {
    fn default() -> Self {
        Self::new(true, Permission::Default, None, None, None)
    }
}

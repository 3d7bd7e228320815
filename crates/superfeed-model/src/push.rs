//! Push subscription wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// The user has not been asked yet.
    #[default]
    Default,
    /// Notifications are allowed.
    Granted,
    /// Notifications are blocked; only the user can undo this.
    Denied,
}

impl Permission {
    /// Whether notifications may be shown.
    pub fn is_granted(self) -> bool {
        self == Permission::Granted
    }

    /// Lowercase name as used by the platform API.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Default => "default",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A browser push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Push service endpoint URL; identifies the subscription.
    pub endpoint: String,
    /// Browser's P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

/// A subscription as stored by the backend for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// The subscription itself.
    #[serde(flatten)]
    pub subscription: PushSubscription,
    /// Whether pushes are delivered to this endpoint.
    pub enabled: bool,
    /// Last time the record was written.
    pub updated_at: DateTime<Utc>,
}

/// Everything the backend holds about one user's push preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Account-level "notifications enabled" preference.
    #[serde(default)]
    pub enabled: bool,
    /// Subscriptions, unique by endpoint.
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionRecord>,
}

impl ServerRecord {
    /// Find the record for `endpoint`.
    pub fn find(&self, endpoint: &str) -> Option<&SubscriptionRecord> {
        self.subscriptions
            .iter()
            .find(|r| r.subscription.endpoint == endpoint)
    }

    /// Whether `endpoint` is present and enabled.
    pub fn is_enabled(&self, endpoint: &str) -> bool {
        self.find(endpoint).is_some_and(|r| r.enabled)
    }

    /// Insert or replace the record keyed by the subscription's endpoint.
    pub fn upsert(&mut self, subscription: PushSubscription, enabled: bool, now: DateTime<Utc>) {
        match self
            .subscriptions
            .iter_mut()
            .find(|r| r.subscription.endpoint == subscription.endpoint)
        {
            Some(existing) => {
                existing.subscription = subscription;
                existing.enabled = enabled;
                existing.updated_at = now;
            }
            None => self.subscriptions.push(SubscriptionRecord {
                subscription,
                enabled,
                updated_at: now,
            }),
        }
    }

    /// Flip the enabled flag of `endpoint`. Returns `false` when absent.
    pub fn set_enabled(&mut self, endpoint: &str, enabled: bool, now: DateTime<Utc>) -> bool {
        match self
            .subscriptions
            .iter_mut()
            .find(|r| r.subscription.endpoint == endpoint)
        {
            Some(record) => {
                record.enabled = enabled;
                record.updated_at = now;
                true
            }
            None => false,
        }
    }
}

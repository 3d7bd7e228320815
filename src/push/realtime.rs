//! Realtime change feed and service-worker message mapping.
//!
//! Both sources end up as a [`PlatformNotification`] and go through the same
//! show-notification path in the coordinator.

use super::platform::PlatformNotification;
use crate::access::ResolvedChannel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Table carrying channel rows in the backend.
pub const CHANNELS_TABLE: &str = "channels";

const USERNAME_COLUMN: &str = "username";

/// Preview columns, tried in order.
const PREVIEW_COLUMNS: &[&str] = &["last_message", "message", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row change from the backend's realtime feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    /// The row after the change (empty for deletes).
    #[serde(default, rename = "new")]
    pub record: Map<String, Value>,
}

impl ChangeEvent {
    fn column(&self, name: &str) -> Option<&str> {
        self.record.get(name).and_then(Value::as_str)
    }

    /// Turn a row change into channel activity. Deletes and rows without a
    /// username carry nothing worth notifying about.
    pub fn to_activity(&self) -> Option<ChannelActivity> {
        if self.kind == ChangeKind::Delete {
            return None;
        }
        let username = self.column(USERNAME_COLUMN)?.to_string();
        let preview = PREVIEW_COLUMNS
            .iter()
            .find_map(|c| self.column(c).filter(|s| !s.trim().is_empty()))
            .map(str::to_string);
        Some(ChannelActivity {
            username,
            kind: self.kind,
            preview,
        })
    }
}

/// Equality predicate on one column of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: String,
    pub column: String,
    pub value: String,
}

impl ChangeFilter {
    /// Feed filter for a realtime channel; `None` when the channel does not
    /// deliver realtime updates.
    pub fn for_channel(channel: &ResolvedChannel) -> Option<Self> {
        channel.delivers_realtime().then(|| Self {
            table: CHANNELS_TABLE.to_string(),
            column: USERNAME_COLUMN.to_string(),
            value: channel.username.clone(),
        })
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table && event.column(&self.column) == Some(self.value.as_str())
    }
}

impl fmt::Display for ChangeFilter {
    /// PostgREST-style `column=eq.value`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

/// New activity on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelActivity {
    pub username: String,
    pub kind: ChangeKind,
    pub preview: Option<String>,
}

impl ChannelActivity {
    pub fn into_notification(self, icon: Option<String>) -> PlatformNotification {
        let body = match (self.preview, self.kind) {
            (Some(preview), _) => preview,
            (None, ChangeKind::Insert) => "New channel".to_string(),
            (None, _) => "New activity".to_string(),
        };
        PlatformNotification {
            title: self.username.clone(),
            body,
            url: Some(format!("/{}", self.username)),
            icon,
            tag: Some(self.username),
        }
    }
}

/// Payload a service worker forwards to the page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl PushMessage {
    pub fn into_notification(
        self,
        default_title: &str,
        icon: Option<String>,
    ) -> PlatformNotification {
        PlatformNotification {
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| default_title.to_string()),
            body: self.body,
            url: self.url,
            icon,
            tag: self.tag,
        }
    }
}

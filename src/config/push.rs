//! Push coordinator configuration.

use super::defaults::{default_notification_title, default_queue_depth};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Decode a base64url application server key. Surrounding whitespace and
/// trailing padding are ignored.
pub fn decode_server_key(key: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(key.trim().trim_end_matches('='))
}

/// Push coordinator configuration.
///
/// ```toml
/// [push]
/// application_server_key = "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U"
/// notification_title = "Superfeed"
/// icon = "/icons/192.png"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// VAPID public key (base64url, uncompressed P-256 point).
    /// Required before notifications can be enabled.
    #[serde(default)]
    pub application_server_key: Option<String>,
    /// Title used when an incoming event carries none (default: "Superfeed").
    #[serde(default = "default_notification_title")]
    pub notification_title: String,
    /// Icon attached to platform notifications.
    #[serde(default)]
    pub icon: Option<String>,
    /// Coordinator event queue capacity (default: 64).
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            application_server_key: None,
            notification_title: default_notification_title(),
            icon: None,
            queue_depth: default_queue_depth(),
        }
    }
}

//! Immutable channel catalog.
//!
//! Built once from configuration and shared behind `Arc`. Construction does
//! all the indexing work so that every lookup afterwards is a single hash lookup:
//!
//! - **Base directory**: the hierarchy flattened into one entry per member,
//!   tagged with the role inferred from the username suffix.
//! - **Premium table**: the configured channels, keyed by username.
//! - **Related index**: child username -> parent username, built by walking
//!   every parent's related-channel list.

use crate::config::Config;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use superfeed_model::{ChannelConfig, HierarchyNode, Role};
use tracing::{debug, warn};

/// A channel listed in the organizational hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseChannel {
    pub username: String,
    pub role: Role,
    pub is_realtime: bool,
    /// Hierarchy node names from the root to the list holding this channel.
    pub path: Vec<String>,
}

/// Static channel configuration with precomputed indexes.
#[derive(Debug, Default)]
pub struct Catalog {
    channels: BTreeMap<String, ChannelConfig>,
    directory: HashMap<String, BaseChannel>,
    related_index: HashMap<String, String>,
}

impl Catalog {
    /// Index `channels` and flatten `hierarchy`.
    ///
    /// A username listed twice in the hierarchy keeps its first entry. A
    /// related channel claimed by several parents belongs to the first parent
    /// in username order.
    pub fn new(channels: BTreeMap<String, ChannelConfig>, hierarchy: &[HierarchyNode]) -> Self {
        let mut directory = HashMap::new();
        for root in hierarchy {
            root.for_each_member(&mut |path, member| {
                if directory.contains_key(&member.username) {
                    warn!(username = %member.username, "Duplicate hierarchy entry ignored");
                    return;
                }
                directory.insert(
                    member.username.clone(),
                    BaseChannel {
                        username: member.username.clone(),
                        role: Role::from_username(&member.username),
                        is_realtime: member.is_realtime,
                        path: path.iter().map(|s| s.to_string()).collect(),
                    },
                );
            });
        }

        let mut related_index: HashMap<String, String> = HashMap::new();
        for (parent, entry) in &channels {
            for related in &entry.related_channels {
                if let Some(existing) = related_index.get(&related.username) {
                    if existing != parent {
                        warn!(
                            username = %related.username,
                            owner = %existing,
                            ignored = %parent,
                            "Related channel claimed by multiple parents"
                        );
                    }
                    continue;
                }
                related_index.insert(related.username.clone(), parent.clone());
            }
        }

        debug!(
            channels = channels.len(),
            directory = directory.len(),
            related = related_index.len(),
            "Catalog indexed"
        );

        Self {
            channels,
            directory,
            related_index,
        }
    }

    /// Build the catalog described by a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.channels.clone(), &config.hierarchy)
    }

    /// Top-level premium entry for `username`.
    pub fn entry(&self, username: &str) -> Option<&ChannelConfig> {
        self.channels.get(username)
    }

    /// Base directory entry for `username`.
    pub fn base(&self, username: &str) -> Option<&BaseChannel> {
        self.directory.get(username)
    }

    /// Username of the parent listing `username` as a related channel.
    pub fn parent_of(&self, username: &str) -> Option<&str> {
        self.related_index.get(username).map(String::as_str)
    }

    /// Whether the catalog knows `username` in any capacity.
    pub fn contains(&self, username: &str) -> bool {
        self.channels.contains_key(username)
            || self.directory.contains_key(username)
            || self.related_index.contains_key(username)
    }

    /// Configured (top-level) usernames in ascending order.
    pub fn configured(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Every base directory entry, in no particular order.
    pub fn directory(&self) -> impl Iterator<Item = &BaseChannel> {
        self.directory.values()
    }

    /// Number of directory entries.
    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }
}

//! Geographic/organizational hierarchy.
//!
//! The hierarchy is a tree of named nodes (states, districts, constituencies,
//! ...). Leaf lists hold the member channels. Flattening the tree yields the
//! base channel directory.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Display name of the node.
    pub name: String,
    /// Optional node kind ("state", "district", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Nested nodes.
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
    /// Member channels attached to this node.
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

impl HierarchyNode {
    /// Visit every member of this subtree together with the chain of node
    /// names leading to it (this node first).
    pub fn for_each_member<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&[&'a str], &'a MemberEntry),
    {
        let mut path = Vec::new();
        self.walk(&mut path, f);
    }

    fn walk<'a, F>(&'a self, path: &mut Vec<&'a str>, f: &mut F)
    where
        F: FnMut(&[&'a str], &'a MemberEntry),
    {
        path.push(self.name.as_str());
        for member in &self.members {
            f(path.as_slice(), member);
        }
        for child in &self.children {
            child.walk(path, f);
        }
        path.pop();
    }
}

/// A member channel listed in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEntry {
    /// Channel username.
    pub username: String,
    /// Whether the channel publishes over the realtime feed.
    #[serde(default)]
    pub is_realtime: bool,
}

/// Role of a channel, inferred from its username suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Member of parliament (`_mp` suffix).
    Mp,
    /// Member of the legislative assembly (`_mla` suffix).
    Mla,
    /// Any other channel.
    Local,
}

impl Role {
    /// Infer the role from a username suffix.
    pub fn from_username(username: &str) -> Self {
        if username.ends_with("_mp") {
            Role::Mp
        } else if username.ends_with("_mla") {
            Role::Mla
        } else {
            Role::Local
        }
    }

    /// Lowercase name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mp => "mp",
            Role::Mla => "mla",
            Role::Local => "local",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Access tier: a resolved channel merged with the viewer's request state.

use super::resolver::{ChannelAccessResolver, ResolvedChannel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// The viewer's access request for one channel, as returned by the backend
/// access-map RPC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

impl FromStr for AccessRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown access request status '{other}'")),
        }
    }
}

/// Request state per channel username.
pub type AccessMap = HashMap<String, AccessRequestStatus>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    /// The viewer is the channel or its owner.
    Owner,
    /// Not gated.
    Open,
    /// Gated, request approved.
    Member,
    /// Gated, request awaiting review.
    Pending,
    /// Gated, no usable request.
    Locked,
}

/// What the UI may show for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub username: String,
    pub tier: AccessTier,
    pub can_view: bool,
    pub blur_content: bool,
    pub show_join: bool,
    pub can_post: bool,
}

/// Decide the viewer's access to `channel`.
pub fn decide(channel: &ResolvedChannel, viewer: &str, status: AccessRequestStatus) -> AccessDecision {
    let tier = if viewer == channel.username || channel.owner_username.as_deref() == Some(viewer) {
        AccessTier::Owner
    } else if !channel.is_gated() {
        AccessTier::Open
    } else {
        match status {
            AccessRequestStatus::Approved => AccessTier::Member,
            AccessRequestStatus::Pending => AccessTier::Pending,
            AccessRequestStatus::None | AccessRequestStatus::Rejected => AccessTier::Locked,
        }
    };

    let can_view = matches!(tier, AccessTier::Owner | AccessTier::Open | AccessTier::Member);
    let can_post = tier == AccessTier::Owner || (can_view && !channel.flags.is_update_only);

    AccessDecision {
        username: channel.username.clone(),
        tier,
        can_view,
        blur_content: !can_view,
        show_join: tier == AccessTier::Locked,
        can_post,
    }
}

/// Decide access for every channel in `access`. Unknown usernames are
/// skipped.
pub fn decide_all(
    resolver: &ChannelAccessResolver,
    viewer: &str,
    access: &AccessMap,
) -> Vec<AccessDecision> {
    let mut decisions: Vec<_> = access
        .iter()
        .filter_map(|(username, status)| {
            resolver
                .resolve(username)
                .map(|channel| decide(&channel, viewer, *status))
        })
        .collect();
    decisions.sort_by(|a, b| a.username.cmp(&b.username));
    decisions
}

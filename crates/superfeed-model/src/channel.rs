//! Channel configuration entries.
//!
//! A [`ChannelConfig`] is one row of the premium configuration table, keyed
//! by channel username. Every flag defaults to `false` unless the entry sets
//! it. Related channels carry a sparse [`FlagOverrides`] instead of a full
//! flag set so that unset values can fall back to the related channel's own
//! top-level entry.

use crate::onboarding::OnboardingConfig;
use serde::{Deserialize, Serialize};

/// The independent boolean attributes of a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelFlags {
    /// Content is gated behind an approved access request.
    pub is_premium: bool,
    /// Listed publicly and readable without membership.
    pub is_public: bool,
    /// Operated by an automated agent.
    pub is_agent: bool,
    /// Direct (one-to-one) channel.
    pub is_direct: bool,
    /// Messages live in the owner's isolated database.
    pub is_owner_db: bool,
    /// Channel activity is delivered over the realtime change feed.
    pub is_realtime: bool,
    /// Only the owner may post; members read updates.
    pub is_update_only: bool,
}

impl ChannelFlags {
    /// Flags for a channel that has no configuration entry at all.
    ///
    /// Unconfigured channels are public; every other flag is off.
    pub fn unconfigured() -> Self {
        Self {
            is_public: true,
            ..Self::default()
        }
    }
}

/// Sparse per-reference override of [`ChannelFlags`].
///
/// `None` means "not set here"; the resolver decides what fills the gap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagOverrides {
    /// Override for [`ChannelFlags::is_premium`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    /// Override for [`ChannelFlags::is_public`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    /// Override for [`ChannelFlags::is_agent`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_agent: Option<bool>,
    /// Override for [`ChannelFlags::is_direct`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_direct: Option<bool>,
    /// Override for [`ChannelFlags::is_owner_db`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_owner_db: Option<bool>,
    /// Override for [`ChannelFlags::is_realtime`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_realtime: Option<bool>,
    /// Override for [`ChannelFlags::is_update_only`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_update_only: Option<bool>,
}

/// Connection details of an isolated backend tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConnection {
    /// Base URL of the tenant backend.
    pub url: String,
    /// Public (anonymous) API key for the tenant.
    pub anon_key: String,
}

/// A purchasable product offered by a premium channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Optional long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in minor currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
}

/// Reference from a parent channel to one of its related channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedChannelRef {
    /// Username of the related channel.
    pub username: String,
    /// Flags set explicitly on this reference.
    #[serde(flatten)]
    pub overrides: FlagOverrides,
    /// Tenant override; when absent the parent's tenant is inherited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_connection: Option<TenantConnection>,
}

impl RelatedChannelRef {
    /// Reference with no overrides.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            overrides: FlagOverrides::default(),
            tenant_connection: None,
        }
    }
}

/// One entry of the premium configuration table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Flags of the channel itself.
    #[serde(flatten)]
    pub flags: ChannelFlags,
    /// Related channels, unique by username within this entry.
    pub related_channels: Vec<RelatedChannelRef>,
    /// Isolated tenant backend, inherited by related channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_connection: Option<TenantConnection>,
    /// Multi-step access request form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding: Option<OnboardingConfig>,
    /// Products sold through the channel.
    pub products: Vec<Product>,
}

impl ChannelConfig {
    /// Find the reference to `username` among this entry's related channels.
    pub fn related(&self, username: &str) -> Option<&RelatedChannelRef> {
        self.related_channels
            .iter()
            .find(|r| r.username == username)
    }
}

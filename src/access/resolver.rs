//! Channel access resolution.
//!
//! `resolve(username)` computes a channel's effective attributes from the
//! [`Catalog`], in priority order:
//!
//! 1. **Top-level**: the username is a key of the premium table. Flags come
//!    straight from the entry; its related channels are resolved alongside.
//! 2. **Related**: the username is listed under some parent. Flags come from
//!    the parent's reference, the parent becomes `owner_username`, and every
//!    other related channel of that parent is a sibling.
//! 3. **Unconfigured**: known only from the base directory. Public, every
//!    other flag off.
//!
//! A username that is both a top-level entry and someone's related channel
//! resolves as top-level.
//!
//! ## Premium is an OR
//!
//! A related channel is premium if its reference says so *or* the related
//! username has its own premium top-level entry. The reference does not take
//! precedence over the table: `is_premium = false` on a reference cannot turn
//! off a premium top-level entry. Every other flag uses the reference value
//! when set, then the top-level entry, then `false`.

use super::catalog::{BaseChannel, Catalog};
use crate::metrics;
use crate::telemetry::spans;
use serde::Serialize;
use std::sync::Arc;
use superfeed_model::{
    ChannelConfig, ChannelFlags, FlagOverrides, OnboardingConfig, Product, RelatedChannelRef, Role,
    TenantConnection,
};
use tracing::debug;

/// Which rule produced a [`ResolvedChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionCase {
    TopLevel,
    Related,
    Unconfigured,
}

impl ResolutionCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionCase::TopLevel => "top_level",
            ResolutionCase::Related => "related",
            ResolutionCase::Unconfigured => "unconfigured",
        }
    }
}

/// A related or sibling channel with its flags resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRelated {
    pub username: String,
    pub role: Role,
    #[serde(flatten)]
    pub flags: ChannelFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_connection: Option<TenantConnection>,
}

/// Effective attributes of a channel. Computed on demand, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedChannel {
    pub username: String,
    pub role: Role,
    pub case: ResolutionCase,
    /// Directory metadata, when the hierarchy lists the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<BaseChannel>,
    #[serde(flatten)]
    pub flags: ChannelFlags,
    /// Parent listing this channel as related. Lookup key only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_username: Option<String>,
    pub related_channels: Vec<ResolvedRelated>,
    pub sibling_channels: Vec<ResolvedRelated>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_connection: Option<TenantConnection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding: Option<OnboardingConfig>,
    pub products: Vec<Product>,
}

impl ResolvedChannel {
    /// Whether channel activity arrives over the realtime feed, either by
    /// configuration or by the directory entry.
    pub fn delivers_realtime(&self) -> bool {
        self.flags.is_realtime || self.base.as_ref().is_some_and(|b| b.is_realtime)
    }

    /// Whether viewing requires more than being signed in.
    pub fn is_gated(&self) -> bool {
        self.flags.is_premium || !self.flags.is_public
    }
}

/// Resolves usernames against an immutable [`Catalog`].
///
/// Cheap to clone; clones share the catalog.
#[derive(Debug, Clone)]
pub struct ChannelAccessResolver {
    catalog: Arc<Catalog>,
}

impl ChannelAccessResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolve `username`, or `None` when the catalog does not know it.
    pub fn resolve(&self, username: &str) -> Option<ResolvedChannel> {
        let _span = spans::resolve(username).entered();

        let resolved = if let Some(entry) = self.catalog.entry(username) {
            Some(self.resolve_top_level(username, entry))
        } else if let Some(parent) = self.catalog.parent_of(username) {
            self.resolve_related(username, parent)
        } else if self.catalog.base(username).is_some() {
            Some(self.resolve_unconfigured(username))
        } else {
            None
        };

        let case = resolved.as_ref().map_or("not_found", |r| r.case.as_str());
        metrics::record_resolution(case);
        debug!(case, "Resolved channel");
        resolved
    }

    fn resolve_top_level(&self, username: &str, entry: &ChannelConfig) -> ResolvedChannel {
        let related_channels = self.resolve_list(entry, entry.related_channels.iter());

        ResolvedChannel {
            username: username.to_string(),
            role: Role::from_username(username),
            case: ResolutionCase::TopLevel,
            base: self.catalog.base(username).cloned(),
            flags: entry.flags,
            owner_username: None,
            related_channels,
            sibling_channels: Vec::new(),
            tenant_connection: entry.tenant_connection.clone(),
            onboarding: entry.onboarding.clone(),
            products: entry.products.clone(),
        }
    }

    fn resolve_related(&self, username: &str, parent: &str) -> Option<ResolvedChannel> {
        // The index is built from the same table, so both lookups succeed for
        // a consistent catalog.
        let parent_entry = self.catalog.entry(parent)?;
        let reference = parent_entry.related(username)?;
        let me = self.resolve_reference(reference, parent_entry);

        let sibling_channels = self.resolve_list(
            parent_entry,
            parent_entry
                .related_channels
                .iter()
                .filter(|r| r.username != username),
        );

        Some(ResolvedChannel {
            username: username.to_string(),
            role: me.role,
            case: ResolutionCase::Related,
            base: self.catalog.base(username).cloned(),
            flags: me.flags,
            owner_username: Some(parent.to_string()),
            related_channels: Vec::new(),
            sibling_channels,
            tenant_connection: me.tenant_connection,
            onboarding: parent_entry.onboarding.clone(),
            products: Vec::new(),
        })
    }

    fn resolve_unconfigured(&self, username: &str) -> ResolvedChannel {
        ResolvedChannel {
            username: username.to_string(),
            role: Role::from_username(username),
            case: ResolutionCase::Unconfigured,
            base: self.catalog.base(username).cloned(),
            flags: ChannelFlags::unconfigured(),
            owner_username: None,
            related_channels: Vec::new(),
            sibling_channels: Vec::new(),
            tenant_connection: None,
            onboarding: None,
            products: Vec::new(),
        }
    }

    /// Resolve references of `parent`, sorted strictly ascending by username.
    fn resolve_list<'a>(
        &self,
        parent: &ChannelConfig,
        refs: impl Iterator<Item = &'a RelatedChannelRef>,
    ) -> Vec<ResolvedRelated> {
        let mut list: Vec<ResolvedRelated> = refs
            .map(|r| self.resolve_reference(r, parent))
            .collect();
        list.sort_by(|a, b| a.username.cmp(&b.username));
        list.dedup_by(|a, b| a.username == b.username);
        list
    }

    fn resolve_reference(&self, reference: &RelatedChannelRef, parent: &ChannelConfig) -> ResolvedRelated {
        let top_level = self.catalog.entry(&reference.username).map(|e| &e.flags);
        ResolvedRelated {
            username: reference.username.clone(),
            role: Role::from_username(&reference.username),
            flags: effective_flags(&reference.overrides, top_level),
            tenant_connection: reference
                .tenant_connection
                .clone()
                .or_else(|| parent.tenant_connection.clone()),
        }
    }
}

/// Flags of a related channel reference.
///
/// `is_premium` is the OR of the override and the top-level entry. Every
/// other flag prefers the override, then the top-level entry, then `false`.
pub fn effective_flags(overrides: &FlagOverrides, top_level: Option<&ChannelFlags>) -> ChannelFlags {
    let pick = |own: Option<bool>, table: fn(&ChannelFlags) -> bool| {
        own.or_else(|| top_level.map(table)).unwrap_or(false)
    };

    ChannelFlags {
        is_premium: overrides.is_premium.unwrap_or(false)
            || top_level.is_some_and(|t| t.is_premium),
        is_public: pick(overrides.is_public, |f| f.is_public),
        is_agent: pick(overrides.is_agent, |f| f.is_agent),
        is_direct: pick(overrides.is_direct, |f| f.is_direct),
        is_owner_db: pick(overrides.is_owner_db, |f| f.is_owner_db),
        is_realtime: pick(overrides.is_realtime, |f| f.is_realtime),
        is_update_only: pick(overrides.is_update_only, |f| f.is_update_only),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn resolver(toml: &str) -> ChannelAccessResolver {
        let config: Config = toml::from_str(toml).unwrap();
        ChannelAccessResolver::new(Arc::new(Catalog::from_config(&config)))
    }

    const CATALOG: &str = r#"
[channels.news]
is_public = true
is_realtime = true

[channels.news.tenant_connection]
url = "https://news.example"
anon_key = "news-anon"

[[channels.news.related_channels]]
username = "carol"
is_agent = true

[[channels.news.related_channels]]
username = "alice"
is_premium = true

[[channels.news.related_channels]]
username = "bob"

[[channels.news.related_channels]]
username = "dave"

[channels.news.related_channels.tenant_connection]
url = "https://dave.example"
anon_key = "dave-anon"

[channels.bob]
is_premium = true
is_public = true

[[channels.bob.products]]
id = "monthly"
title = "Monthly"
price = 9900

[[hierarchy]]
name = "Maharashtra"

[[hierarchy.members]]
username = "pune_mp"
is_realtime = true

[[hierarchy.members]]
username = "carol"
"#;

    #[test]
    fn clones_share_one_catalog() {
        let r = resolver(CATALOG);
        let clone = r.clone();
        assert!(std::ptr::eq(r.catalog(), clone.catalog()));
        assert_eq!(r.catalog().parent_of("carol"), Some("news"));
    }

    #[test]
    fn effective_flags_or_semantics_for_premium() {
        let table = ChannelFlags {
            is_premium: true,
            is_public: true,
            ..ChannelFlags::default()
        };
        let off = FlagOverrides {
            is_premium: Some(false),
            is_public: Some(false),
            ..FlagOverrides::default()
        };
        let flags = effective_flags(&off, Some(&table));
        // Premium cannot be switched off by the reference...
        assert!(flags.is_premium);
        // ...but every other flag honours the override.
        assert!(!flags.is_public);

        let flags = effective_flags(&FlagOverrides::default(), Some(&table));
        assert!(flags.is_public);

        let flags = effective_flags(&FlagOverrides::default(), None);
        assert_eq!(flags, ChannelFlags::default());
    }

    #[test]
    fn unknown_username_is_none() {
        let r = resolver(CATALOG);
        assert!(r.resolve("nobody").is_none());
    }

    #[test]
    fn top_level_channel() {
        let r = resolver(CATALOG);
        let news = r.resolve("news").unwrap();
        assert_eq!(news.case, ResolutionCase::TopLevel);
        assert_eq!(news.owner_username, None);
        assert!(news.flags.is_public);
        assert!(news.flags.is_realtime);
        assert!(!news.flags.is_premium);
        assert!(news.sibling_channels.is_empty());

        let names: Vec<_> = news.related_channels.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol", "dave"]);

        // Related entries inherit the parent's tenant unless overridden.
        let tenant = |name: &str| {
            news.related_channels
                .iter()
                .find(|c| c.username == name)
                .and_then(|c| c.tenant_connection.as_ref())
                .map(|t| t.url.clone())
        };
        assert_eq!(tenant("alice").as_deref(), Some("https://news.example"));
        assert_eq!(tenant("dave").as_deref(), Some("https://dave.example"));
    }

    #[test]
    fn premium_via_override_or_top_level() {
        let r = resolver(CATALOG);

        let alice = r.resolve("alice").unwrap();
        assert!(alice.flags.is_premium);
        assert_eq!(alice.case, ResolutionCase::Related);

        // bob is a top-level entry, so it resolves as top-level...
        let bob = r.resolve("bob").unwrap();
        assert!(bob.flags.is_premium);
        assert_eq!(bob.case, ResolutionCase::TopLevel);

        // ...and as a sibling it is premium through the table.
        let siblings = &alice.sibling_channels;
        let bob_sibling = siblings.iter().find(|s| s.username == "bob").unwrap();
        assert!(bob_sibling.flags.is_premium);
        assert!(bob_sibling.flags.is_public);
    }

    #[test]
    fn top_level_wins_over_related_listing() {
        let r = resolver(CATALOG);
        let bob = r.resolve("bob").unwrap();
        assert_eq!(bob.owner_username, None);
        assert!(bob.sibling_channels.is_empty());
        assert_eq!(bob.products.len(), 1);
        assert_eq!(bob.products[0].price, Some(9900));
    }

    #[test]
    fn related_channel_has_owner_and_sorted_siblings() {
        let r = resolver(CATALOG);
        let carol = r.resolve("carol").unwrap();
        assert_eq!(carol.owner_username.as_deref(), Some("news"));
        assert!(carol.flags.is_agent);
        assert!(!carol.flags.is_public);
        assert!(carol.products.is_empty());
        assert!(carol.related_channels.is_empty());

        let names: Vec<_> = carol.sibling_channels.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "dave"]);
        assert!(carol.sibling_channels.windows(2).all(|w| w[0].username < w[1].username));

        // Tenant inherited from the parent; directory metadata kept.
        assert_eq!(carol.tenant_connection.unwrap().url, "https://news.example");
        assert_eq!(carol.base.unwrap().path, vec!["Maharashtra"]);
    }

    #[test]
    fn related_tenant_override() {
        let r = resolver(CATALOG);
        let dave = r.resolve("dave").unwrap();
        assert_eq!(dave.tenant_connection.unwrap().anon_key, "dave-anon");
    }

    #[test]
    fn unconfigured_channel_is_public_only() {
        let r = resolver(CATALOG);
        let mp = r.resolve("pune_mp").unwrap();
        assert_eq!(mp.case, ResolutionCase::Unconfigured);
        assert_eq!(mp.role, Role::Mp);
        assert_eq!(mp.flags, ChannelFlags::unconfigured());
        assert!(mp.related_channels.is_empty());
        assert!(mp.products.is_empty());
        assert!(mp.owner_username.is_none());
        // Realtime delivery still follows the directory entry.
        assert!(mp.delivers_realtime());
        assert!(!mp.is_gated());
    }

    #[test]
    fn resolution_is_idempotent() {
        let r = resolver(CATALOG);
        for name in ["news", "alice", "bob", "carol", "dave", "pune_mp"] {
            assert_eq!(r.resolve(name), r.resolve(name));
        }
    }
}

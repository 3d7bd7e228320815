//! # superfeed-model
//!
//! Data model shared by the superfeed clients: the static channel
//! configuration schema (premium table, related channels, tenant connections,
//! onboarding forms), the organizational hierarchy that seeds the base
//! channel directory, and the push subscription records exchanged with the
//! backend.
//!
//! Everything here is plain data with serde support. Resolution and
//! reconciliation logic lives in the `superfeed` crate.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod channel;
pub mod hierarchy;
pub mod onboarding;
pub mod push;

pub use channel::{ChannelConfig, ChannelFlags, FlagOverrides, Product, RelatedChannelRef, TenantConnection};
pub use hierarchy::{HierarchyNode, MemberEntry, Role};
pub use onboarding::{
    AnswerValue, Answers, FieldKind, OnboardingConfig, OnboardingError, OnboardingField,
    OnboardingScreen, RpcCall,
};
pub use push::{Permission, PushSubscription, ServerRecord, SubscriptionRecord};

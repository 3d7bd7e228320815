//! Channel access resolution.
//!
//! - [`catalog`]: immutable index over the static configuration (flattened
//!   base directory, premium table, reverse related-channel map).
//! - [`resolver`]: `resolve(username)` into a [`ResolvedChannel`].
//! - [`tier`]: merges a resolved channel with the viewer's request state.

pub mod catalog;
pub mod resolver;
pub mod tier;

pub use catalog::{BaseChannel, Catalog};
pub use resolver::{ChannelAccessResolver, ResolutionCase, ResolvedChannel, ResolvedRelated};
pub use tier::{AccessDecision, AccessMap, AccessRequestStatus, AccessTier, decide, decide_all};

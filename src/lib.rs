//! superfeed - channel access resolution and push subscription coordination.
//!
//! Two cooperating pieces sit under the superfeed clients:
//!
//! - [`access`]: resolves a channel username against the static catalog
//!   (premium table, related channels, organizational hierarchy) into its
//!   effective visibility, ownership and tenancy, and merges that with the
//!   viewer's request state into an access tier.
//! - [`push`]: a single-task state machine reconciling notification
//!   permission, the browser push subscription and the server-held record
//!   into one "notifications enabled" signal.

pub mod access;
pub mod config;
pub mod error;
pub mod metrics;
pub mod push;
pub mod telemetry;

pub use access::{AccessDecision, AccessTier, Catalog, ChannelAccessResolver, ResolvedChannel};
pub use config::Config;
pub use error::PushError;
pub use push::{PushCoordinator, PushHandle, PushState, PushStatus};

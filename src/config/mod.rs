//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: The top-level [`Config`] and file loading
//! - [`push`]: Push coordinator configuration (PushConfig)
//! - [`defaults`]: Serde default value functions
//! - [`validation`]: Consistency checks run after loading

mod defaults;
mod push;
mod types;
pub mod validation;

pub use push::{PushConfig, decode_server_key};
pub use types::{Config, ConfigError};
pub use validation::{ValidationError, validate};

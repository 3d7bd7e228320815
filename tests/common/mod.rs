//! Integration test common infrastructure.
//!
//! Provides catalog fixtures and push collaborators for driving the
//! coordinator through its lifecycle.

pub mod catalog;
pub mod push;

#[allow(unused_imports)]
pub use catalog::{SAMPLE_CATALOG, sample_resolver};
#[allow(unused_imports)]
pub use push::{GatedPlatform, PushFixture, SERVER_KEY};

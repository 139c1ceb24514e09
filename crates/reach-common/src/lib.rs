//! Shared types for OpenReach
//!
//! Error taxonomy used across the vendor client, the aggregation core,
//! and the HTTP surface.

pub mod error;

pub use error::{ReachError, ReachResult};

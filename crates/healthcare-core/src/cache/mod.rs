//! Shared response cache.
//!
//! This module provides the `ResponseCache` the app shares for backend
//! responses. It holds raw bodies in memory up to a byte budget and is
//! purged wholesale when the process is under memory pressure.

pub mod response;

pub use response::{CachedData, ResponseCache};

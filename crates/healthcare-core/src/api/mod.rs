//! Remote adapter module for the Healthcare backend.
//!
//! This module provides the `RemoteAdapter` trait the authentication
//! coordinator drives, and `HttpAdapterClient`, the reqwest-based
//! implementation talking to the backend's adapter endpoints.

pub mod adapter;
pub mod client;
pub mod error;

pub use adapter::{AdapterReply, Challenge, ChallengeAnswer, Invocation, RemoteAdapter};
pub use client::HttpAdapterClient;
pub use error::AdapterError;

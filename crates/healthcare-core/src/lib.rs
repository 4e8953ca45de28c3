//! Healthcare core - session authentication and local persistence.
//!
//! This crate holds everything below the UI: the challenge/response login
//! handshake against the backend adapter, the lazily built local store,
//! the shared response cache, and the dispatcher that maps process
//! lifecycle signals onto them.

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod persistence;

#[cfg(test)]
pub(crate) mod testing;

pub use app::AppContext;
pub use auth::{AuthError, ChallengeCoordinator, SessionStatus, SessionToken};
pub use config::Config;
pub use events::{AuthEvent, AuthEventBus};
pub use lifecycle::{Flow, LifecycleBridge, LifecycleEvent, LoginSurface, LoginViewHandle};
pub use persistence::PersistenceStack;

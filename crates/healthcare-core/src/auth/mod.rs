//! Authentication module for the backend session.
//!
//! This module provides:
//! - `CredentialStore`: the current (username, password, locale) tuple and its generation
//! - `ChallengeCoordinator`: the challenge/response handshake state machine
//! - `ChallengeHandler`: the seam answering mid-handshake challenges
//! - `CredentialVault` and `Keychain`: optional storage for remembered passwords

pub mod challenge;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod keychain;
pub mod session;

pub use challenge::{AdapterChallengeHandler, ChallengeHandler};
pub use coordinator::ChallengeCoordinator;
pub use credentials::{CredentialStore, Credentials, Generation};
pub use error::AuthError;
pub use keychain::{CredentialVault, Keychain};
pub use session::{SessionData, SessionStatus, SessionToken};

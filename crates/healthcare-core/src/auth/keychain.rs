//! Remembered passwords.
//!
//! Only touched when `remember_credentials` is enabled in the config.
//! [`Keychain`] stores them in the OS keychain.

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

use super::Credentials;

const SERVICE_NAME: &str = "healthcare";

/// Storage for the password of the last successful login.
pub trait CredentialVault: Send + Sync {
    fn remember(&self, credentials: &Credentials) -> Result<()>;

    fn recall(&self, username: &str) -> Result<String>;

    fn forget(&self, username: &str) -> Result<()>;
}

pub struct Keychain;

impl Keychain {
    fn entry(username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, username).context("Failed to create keyring entry")
    }
}

impl CredentialVault for Keychain {
    fn remember(&self, credentials: &Credentials) -> Result<()> {
        Self::entry(&credentials.username)?
            .set_password(&credentials.password)
            .context("Failed to store password in keychain")?;
        debug!(username = %credentials.username, "Password remembered");
        Ok(())
    }

    fn recall(&self, username: &str) -> Result<String> {
        Self::entry(username)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    fn forget(&self, username: &str) -> Result<()> {
        Self::entry(username)?
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        debug!(username = %username, "Remembered password removed");
        Ok(())
    }
}

use async_trait::async_trait;
use std::sync::Arc;

use super::database::Database;
use crate::config::{AgentConfig, CredentialBackend};
use crate::error::Result;

const SERVICE_NAME: &str = "com.beacon.agent";
const AUTH_TOKEN_KEY: &str = "auth_token";

/// Persists the single bearer token across restarts.
///
/// `set_token` overwrites any previous value and completes before returning.
/// `get_token` yields `None` when nothing is stored and only fails on an
/// underlying storage error. `clear_token` is idempotent.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn set_token(&self, token: &str) -> Result<()>;
    async fn get_token(&self) -> Result<Option<String>>;
    async fn clear_token(&self) -> Result<()>;
}

/// Token kept in the local preferences table.
pub struct DatabaseCredentialStore {
    db: Database,
}

impl DatabaseCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for DatabaseCredentialStore {
    async fn set_token(&self, token: &str) -> Result<()> {
        self.db.set(AUTH_TOKEN_KEY, token)
    }

    async fn get_token(&self) -> Result<Option<String>> {
        Ok(self.db.get(AUTH_TOKEN_KEY)?.filter(|token| !token.is_empty()))
    }

    async fn clear_token(&self) -> Result<()> {
        self.db.remove(AUTH_TOKEN_KEY)
    }
}

/// Token kept in the platform keychain.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self { service: SERVICE_NAME.to_string() }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, AUTH_TOKEN_KEY)?)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn set_token(&self, token: &str) -> Result<()> {
        // Store directly without checking existing - this reduces keychain prompts
        self.entry()?.set_password(token)?;
        Ok(())
    }

    async fn get_token(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                log::error!("Failed to retrieve auth token: {}", e);
                Err(e.into())
            }
        }
    }

    async fn clear_token(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                log::error!("Failed to delete auth token: {}", e);
                Err(e.into())
            }
        }
    }
}

pub fn credential_store_from_config(config: &AgentConfig, db: &Database) -> Arc<dyn CredentialStore> {
    match config.credential_backend {
        CredentialBackend::Database => Arc::new(DatabaseCredentialStore::new(db.clone())),
        CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
    }
}

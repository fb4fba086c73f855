//! Credential storage behind the OS keychain.
//!
//! Secrets are laid out in two stages: the account identity lives under a
//! fixed, well-known key, and the secret itself is stored under a key equal
//! to the identity value. The identity stays discoverable without ever
//! appearing in a config file.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential stored under {service}/{key}")]
    NotFound { service: String, key: String },

    #[error("credential store failure: {0}")]
    Backend(String),
}

/// Named-secret storage. Injected so the resolver can be tested without a
/// real keychain.
pub trait CredentialStore: Send + Sync {
    /// Reads a secret. An absent entry is `Ok(None)`, not an error.
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, CredentialError>;

    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), CredentialError>;

    /// Removes a secret. Deleting an absent entry is `NotFound`.
    fn delete(&self, service: &str, key: &str) -> Result<(), CredentialError>;
}

/// Production store over the platform keychain.
#[derive(Debug, Default)]
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        KeyringStore
    }

    fn entry(service: &str, key: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(service, key).map_err(|e| CredentialError::Backend(e.to_string()))
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, CredentialError> {
        match Self::entry(service, key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Backend(e.to_string())),
        }
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), CredentialError> {
        Self::entry(service, key)?
            .set_password(value)
            .map_err(|e| CredentialError::Backend(e.to_string()))
    }

    fn delete(&self, service: &str, key: &str) -> Result<(), CredentialError> {
        match Self::entry(service, key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(CredentialError::NotFound {
                service: service.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(CredentialError::Backend(e.to_string())),
        }
    }
}

/// A two-stage credential: identity under `identity_key`, secret under the
/// identity value.
#[derive(Debug, Clone, Copy)]
pub struct CredentialPair {
    pub service: &'static str,
    pub identity_key: &'static str,
}

/// Photo service account (username + password).
pub const PHOTO_SERVICE: CredentialPair = CredentialPair {
    service: "icloud-photo-sync",
    identity_key: "username",
};

/// Pushover account (user key + API token).
pub const NOTIFY_SERVICE: CredentialPair = CredentialPair {
    service: "pushover-photo-sync",
    identity_key: "user_key",
};

impl CredentialPair {
    /// Resolves both stages. Either may be absent independently; a missing
    /// identity always implies a missing secret.
    pub fn load(
        &self,
        store: &dyn CredentialStore,
    ) -> Result<(Option<String>, Option<String>), CredentialError> {
        let identity = store.get(self.service, self.identity_key)?;
        let secret = match &identity {
            Some(identity) => store.get(self.service, identity)?,
            None => None,
        };
        Ok((identity, secret))
    }

    /// Writes both stages.
    pub fn store(
        &self,
        store: &dyn CredentialStore,
        identity: &str,
        secret: &str,
    ) -> Result<(), CredentialError> {
        store.set(self.service, self.identity_key, identity)?;
        store.set(self.service, identity, secret)?;
        Ok(())
    }

    /// Removes both stages. Returns `Ok(false)` when no identity was stored.
    /// A missing secret entry is tolerated so a half-written pair can still
    /// be cleared.
    #[allow(dead_code)] // credential rotation path; used in tests
    pub fn delete(&self, store: &dyn CredentialStore) -> Result<bool, CredentialError> {
        let Some(identity) = store.get(self.service, self.identity_key)? else {
            return Ok(false);
        };
        match store.delete(self.service, &identity) {
            Ok(()) | Err(CredentialError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        store.delete(self.service, self.identity_key)?;
        Ok(true)
    }

    /// True only when both stages resolve.
    pub fn exists(&self, store: &dyn CredentialStore) -> Result<bool, CredentialError> {
        let (identity, secret) = self.load(store)?;
        Ok(identity.is_some() && secret.is_some())
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::sync::Mutex<std::collections::HashMap<(String, String), String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl CredentialStore for MemoryStore {
    fn get(&self, service: &str, key: &str) -> Result<Option<String>, CredentialError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(&(service.to_string(), key.to_string())).cloned())
    }

    fn set(&self, service: &str, key: &str, value: &str) -> Result<(), CredentialError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert((service.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn delete(&self, service: &str, key: &str) -> Result<(), CredentialError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(&(service.to_string(), key.to_string())) {
            Some(_) => Ok(()),
            None => Err(CredentialError::NotFound {
                service: service.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

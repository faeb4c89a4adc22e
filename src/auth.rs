// auth.rs - pluggable authentication and secret-resolution collaborators (component J)
//
// Grounded on the teacher's AuthBackend trait and AuthManager (async_trait collaborators
// with an in-memory reference implementation), trimmed to the two roles SPEC_FULL
// actually names: checking a credential and resolving a NAS's shared secret. The
// teacher's MAC/LDAP/OAuth backends and backend-priority chain have no counterpart here
// and are dropped in the final trim.

use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;

use crate::error::{RadiusError, Result};

/// Returns the clear-text password on file for a user name, or `None` if there is no
/// such account, per SPEC_FULL §4.J. The caller (the access handler) is the one that
/// compares this against the supplied password; the store itself makes no accept/reject
/// decision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn password_for(&self, username: &str) -> Result<Option<String>>;
}

/// Delegates the accept/reject decision to an external system (an LDAP bind, a web
/// service) instead of a local credential comparison.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExternalAuthenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool>;
}

/// Resolves the shared secret configured for a given NAS IP address.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn secret_for(&self, nas_addr: IpAddr) -> Result<Vec<u8>>;
}

/// In-memory credential store, the reference implementation used by tests and by
/// deployments small enough not to need a real database.
pub struct StaticCredentialStore {
    credentials: HashMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new(credentials: HashMap<String, String>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn password_for(&self, username: &str) -> Result<Option<String>> {
        Ok(self.credentials.get(username).cloned())
    }
}

/// An external authenticator that always declines. Useful as a default when no external
/// path is configured but the caller still wants a collaborator to call.
pub struct NullExternalAuthenticator;

#[async_trait]
impl ExternalAuthenticator for NullExternalAuthenticator {
    async fn authenticate(&self, _username: &str, _password: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Secret resolver backed by the static `nas_settings` table loaded from configuration.
pub struct StaticSecretTable {
    secrets: HashMap<IpAddr, Vec<u8>>,
}

impl StaticSecretTable {
    pub fn new(secrets: HashMap<IpAddr, Vec<u8>>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl SecretResolver for StaticSecretTable {
    async fn secret_for(&self, nas_addr: IpAddr) -> Result<Vec<u8>> {
        self.secrets
            .get(&nas_addr)
            .cloned()
            .ok_or(RadiusError::UnknownNas(nas_addr))
    }
}

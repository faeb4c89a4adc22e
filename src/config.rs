// config.rs - TOML configuration loading and validation (ambient component L)
//
// Grounded on the teacher's config.rs (serde + toml, a `Config::from_file` entry point,
// a `validate` pass, and `default_*` helpers feeding `#[serde(default = "...")]`), with
// the deployment-template and captive-portal/LDAP-branding fields dropped: nothing in
// SPEC_FULL names them. `nas_settings` replaces the teacher's flat secret fields, since a
// RADIUS server needs one shared secret per NAS, not one global secret.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RadiusError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub nas_settings: Vec<NasSettings>,
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

/// One statically-configured username/password pair, feeding `auth::StaticCredentialStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_auth_bind")]
    pub bind_auth: SocketAddr,
    #[serde(default = "default_acct_bind")]
    pub bind_acct: SocketAddr,
    /// Worker count for the per-socket receive loop. `None` defers to `num_cpus`.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_auth: default_auth_bind(),
            bind_acct: default_acct_bind(),
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Which authentication collaborators the server should wire up. At least one must be
/// enabled, or `validate` rejects the configuration with `UnconfiguredAuthPath`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub validate_by_credential_store: bool,
    #[serde(default)]
    pub validate_by_ldap: bool,
    #[serde(default)]
    pub ldap: Option<LdapConfig>,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    pub url: String,
    pub bind_dn: String,
    pub bind_password: String,
    pub user_search_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// One NAS's identity and shared secret. Matches `auth::StaticSecretTable`'s shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NasSettings {
    pub address: IpAddr,
    pub secret: String,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_auth_bind() -> SocketAddr {
    "0.0.0.0:1812".parse().unwrap()
}

fn default_acct_bind() -> SocketAddr {
    "0.0.0.0:1813".parse().unwrap()
}

fn default_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// A minimal, valid starting point for `radius-core init`: one NAS entry using the
    /// given shared secret, and the credential-store auth path enabled so the result
    /// passes `validate()` as-is.
    pub fn template(nas_secret: impl Into<String>) -> Self {
        Self {
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            auth: AuthConfig {
                validate_by_credential_store: true,
                ..AuthConfig::default()
            },
            logging: LoggingConfig::default(),
            nas_settings: vec![NasSettings {
                address: "0.0.0.0".parse().unwrap(),
                secret: nas_secret.into(),
                name: Some("example-nas".to_string()),
            }],
            credentials: Vec::new(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| RadiusError::MalformedPacket(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn export(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RadiusError::MalformedPacket(format!("cannot serialize config: {e}")))
    }

    /// Reject configurations that have no authentication path and no NAS secrets at
    /// all, since neither the auth handler nor the server's secret lookup could do
    /// anything useful.
    pub fn validate(&self) -> Result<()> {
        if !self.auth.validate_by_credential_store && !self.auth.validate_by_ldap {
            return Err(RadiusError::UnconfiguredAuthPath);
        }
        if self.auth.validate_by_ldap && self.auth.ldap.is_none() {
            return Err(RadiusError::MalformedPacket(
                "auth.validate_by_ldap is true but no [auth.ldap] section is present".to_string(),
            ));
        }
        if self.nas_settings.is_empty() {
            return Err(RadiusError::MalformedPacket(
                "at least one [[nas_settings]] entry is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn secret_table(&self) -> HashMap<IpAddr, Vec<u8>> {
        self.nas_settings
            .iter()
            .map(|nas| (nas.address, nas.secret.clone().into_bytes()))
            .collect()
    }

    pub fn credential_map(&self) -> HashMap<String, String> {
        self.credentials
            .iter()
            .map(|c| (c.username.clone(), c.password.clone()))
            .collect()
    }
}

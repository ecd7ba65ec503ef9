use crate::error::{FxgateError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Login credentials handed to the gateway adapter.
///
/// Mirrors the property set a hosted trading gateway expects: account
/// credentials, the terminal (account type) to log into, the host discovery
/// URL, and an optional local configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Which terminal to log into, dependent on account type; case sensitive
    pub terminal: String,
    /// Host discovery URL for the gateway
    pub host_url: String,
    /// Optional local file with extra transport configuration
    pub config_file: Option<PathBuf>,
}

impl Credentials {
    pub fn builder() -> CredentialsBuilder {
        CredentialsBuilder::default()
    }
}

/// Builder for [`Credentials`] with missing-field validation.
#[derive(Debug, Default)]
pub struct CredentialsBuilder {
    username: Option<String>,
    password: Option<String>,
    terminal: Option<String>,
    host_url: Option<String>,
    config_file: Option<PathBuf>,
}

impl CredentialsBuilder {
    pub fn username(mut self, v: impl Into<String>) -> Self {
        self.username = Some(v.into());
        self
    }
    pub fn password(mut self, v: impl Into<String>) -> Self {
        self.password = Some(v.into());
        self
    }
    pub fn terminal(mut self, v: impl Into<String>) -> Self {
        self.terminal = Some(v.into());
        self
    }
    pub fn host_url(mut self, v: impl Into<String>) -> Self {
        self.host_url = Some(v.into());
        self
    }
    pub fn config_file(mut self, v: impl Into<PathBuf>) -> Self {
        self.config_file = Some(v.into());
        self
    }

    pub fn build(self) -> Result<Credentials> {
        Ok(Credentials {
            username: self
                .username
                .ok_or_else(|| FxgateError::InvalidConfig("username missing".into()))?,
            password: self
                .password
                .ok_or_else(|| FxgateError::InvalidConfig("password missing".into()))?,
            terminal: self
                .terminal
                .ok_or_else(|| FxgateError::InvalidConfig("terminal missing".into()))?,
            host_url: self
                .host_url
                .ok_or_else(|| FxgateError::InvalidConfig("host_url missing".into()))?,
            config_file: self.config_file,
        })
    }
}

/// Configuration for a [`GatewayClient`](crate::client::GatewayClient).
///
/// The timeouts here are defaults for the client's convenience operations;
/// `submit` always takes an explicit deadline from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub credentials: Credentials,
    /// Deadline for the login confirmation event
    pub login_timeout: Duration,
    /// Default deadline for reference-data and order requests
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            login_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn login_timeout(mut self, v: Duration) -> Self {
        self.login_timeout = v;
        self
    }

    pub fn request_timeout(mut self, v: Duration) -> Self {
        self.request_timeout = v;
        self
    }
}

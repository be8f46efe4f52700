//! Connection parameters for one connector instance.
//!
//! # Design
//! `ConnectionParams` is built once and handed to the connector by value; the
//! connector only ever reads it. The password is a `SecretString` so it never
//! shows up in `Debug` output or logs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Port the service layer listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 50000;

/// Version-qualified base path every request path is appended to.
pub const BASE_PATH: &str = "b1s/v1";

#[derive(Debug, Clone)]
pub struct ConnectionParams {
    user: String,
    password: SecretString,
    company_db: String,
    host: String,
    port: Option<u16>,
    timeout: Option<Duration>,
    verify_certificates: bool,
}

impl ConnectionParams {
    /// `host` carries the scheme, e.g. `https://sap.example.com`.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        company_db: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: SecretString::new(password.into()),
            company_db: company_db.into(),
            host: host.into().trim_end_matches('/').to_string(),
            port: Some(DEFAULT_PORT),
            timeout: None,
            verify_certificates: false,
        }
    }

    /// `None` leaves the port out of the URL entirely.
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Certificates are not verified unless this is set.
    pub fn verify_certificates(mut self, verify: bool) -> Self {
        self.verify_certificates = verify;
        self
    }

    /// Read `B1_USER`, `B1_PASSWORD`, `B1_COMPANY_DB`, `B1_HOST` and the
    /// optional `B1_PORT` (empty means no port) and `B1_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let mut params = Self::new(
            required("B1_USER")?,
            required("B1_PASSWORD")?,
            required("B1_COMPANY_DB")?,
            required("B1_HOST")?,
        );

        if let Some(port) = lookup("B1_PORT") {
            let port = port.trim();
            params.port = if port.is_empty() {
                None
            } else {
                Some(port.parse().map_err(|_| ConfigError::Invalid {
                    name: "B1_PORT",
                    value: port.to_string(),
                })?)
            };
        }

        if let Some(secs) = lookup("B1_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "B1_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
            params.timeout = Some(Duration::from_secs(secs));
        }

        Ok(params)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    pub fn company_db(&self) -> &str {
        &self.company_db
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn verifies_certificates(&self) -> bool {
        self.verify_certificates
    }

    /// Full URL for `path` under the service layer base path.
    pub fn endpoint(&self, path: &str) -> String {
        match self.port {
            Some(port) => format!("{}:{port}/{BASE_PATH}/{path}", self.host),
            None => format!("{}/{BASE_PATH}/{path}", self.host),
        }
    }
}

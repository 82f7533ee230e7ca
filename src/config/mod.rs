//! Configuration handling for the pipeline.
//!
//! Values come from environment variables; the binary layers command line
//! flags on top through [`Config::from_env_with`] and
//! [`Config::with_overrides`]. Only the delivery endpoint is mandatory.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::delivery::TlsConfig;

/// Environment variable names. Public so tests and the binary's help text can
/// refer to them.
pub const ENV_ENDPOINT: &str = "FACTFEED_ENDPOINT";
pub const ENV_CA_CERT: &str = "FACTFEED_CA_CERT";
pub const ENV_EXCLUSIONS: &str = "FACTFEED_EXCLUSIONS";

/// Exclusion list picked up from the working directory when nothing else is
/// configured.
pub const DEFAULT_EXCLUSIONS_FILE: &str = "excluded_domains.json";

/// Runtime configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    endpoint: Url,
    ca_cert_path: Option<PathBuf>,
    exclusions_path: Option<PathBuf>,
}

impl Config {
    /// Create a new config explicitly.
    pub fn new(
        endpoint: Url,
        ca_cert_path: Option<PathBuf>,
        exclusions_path: Option<PathBuf>,
    ) -> Self {
        Self {
            endpoint,
            ca_cert_path,
            exclusions_path,
        }
    }

    /// Load from environment variables.
    ///
    /// Fails when the endpoint is missing or not an absolute URL. Blank
    /// optional variables count as unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(None)
    }

    /// Like [`Config::from_env`], with `endpoint` taking precedence over
    /// the environment.
    pub fn from_env_with(endpoint: Option<&str>) -> Result<Self, ConfigError> {
        let endpoint = endpoint
            .map(str::to_string)
            .or_else(|| non_blank_var(ENV_ENDPOINT))
            .ok_or(ConfigError::Missing {
                field: ENV_ENDPOINT,
            })?;
        let endpoint = parse_endpoint(&endpoint)?;

        let ca_cert_path = non_blank_var(ENV_CA_CERT).map(PathBuf::from);
        let exclusions_path = non_blank_var(ENV_EXCLUSIONS)
            .map(PathBuf::from)
            .or_else(default_exclusions_path);

        Ok(Self {
            endpoint,
            ca_cert_path,
            exclusions_path,
        })
    }

    /// Apply command line overrides. `None` keeps the current value.
    pub fn with_overrides(
        mut self,
        ca_cert_path: Option<PathBuf>,
        exclusions_path: Option<PathBuf>,
    ) -> Self {
        if ca_cert_path.is_some() {
            self.ca_cert_path = ca_cert_path;
        }
        if exclusions_path.is_some() {
            self.exclusions_path = exclusions_path;
        }
        self
    }

    /// Ingestion endpoint that receives fact records.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// CA certificate used to verify the endpoint, if any.
    pub fn ca_cert_path(&self) -> Option<&Path> {
        self.ca_cert_path.as_deref()
    }

    /// JSON exclusion list, if any.
    pub fn exclusions_path(&self) -> Option<&Path> {
        self.exclusions_path.as_deref()
    }

    pub fn tls_config(&self) -> TlsConfig {
        match &self.ca_cert_path {
            Some(path) => TlsConfig::CustomCa(path.clone()),
            None => TlsConfig::SystemTrust,
        }
    }
}

/// Errors that can occur while building a configuration or reading
/// configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required value '{field}'")]
    Missing { field: &'static str },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed exclusion list {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        field: ENV_ENDPOINT,
        reason: e.to_string(),
    })
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_exclusions_path() -> Option<PathBuf> {
    let path = PathBuf::from(DEFAULT_EXCLUSIONS_FILE);
    path.is_file().then_some(path)
}

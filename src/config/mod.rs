//! Typed configuration.
//!
//! Process-level settings come from environment variables, loaded once at
//! startup. Remote credentials are wrapped in `SecretString` so they never
//! show up in logs. Run parameters live in [`ProbeConfig`].

pub mod probe;

pub use probe::{LocateFailure, ProbeConfig, TagStyle};

use crate::error::{Error, Result};
use secrecy::SecretString;

/// Process-level settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Self {
        Self {
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Connection settings for a remote engine.
#[derive(Debug)]
pub struct RemoteConfig {
    /// Base URL of the engine's REST API, e.g. `http://localhost:8080`.
    pub rest_address: String,
    /// Bearer token sent with every request, if the cluster requires one.
    pub token: Option<SecretString>,
}

impl RemoteConfig {
    /// Load from environment variables, failing if `CAMUNDA_REST_ADDRESS`
    /// is missing.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            rest_address: required_var("CAMUNDA_REST_ADDRESS")?,
            token: optional_var("CAMUNDA_TOKEN").map(SecretString::from),
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn required_var(name: &str) -> Result<String> {
    optional_var(name)
        .ok_or_else(|| Error::Config(format!("required environment variable {name} is not set")))
}

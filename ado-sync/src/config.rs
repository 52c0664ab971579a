//! Process configuration.
//!
//! Everything the sync needs is read once from the environment at start-up
//! into a [`SyncConfig`] which is then handed to each component. Lookups go
//! through a closure so tests can inject values without touching the process
//! environment.

use connectors::config::{DEFAULT_ADO_BASE_URL, DEFAULT_PORT_BASE_URL, DEFAULT_TIMEOUT};
use connectors::{AdoConfig, PortConfig};
use std::time::Duration;
use thiserror::Error;

pub const ADO_ORG: &str = "ADO_ORG";
pub const ADO_PAT: &str = "ADO_PAT";
pub const PORT_CLIENT_ID: &str = "PORT_CLIENT_ID";
pub const PORT_CLIENT_SECRET: &str = "PORT_CLIENT_SECRET";
pub const BLUEPRINT_ENV: &str = "BLUEPRINT_ENV";
pub const BLUEPRINT_DEPLOYMENT: &str = "BLUEPRINT_DEPLOYMENT";
pub const PORT_API_URL: &str = "PORT_API_URL";
pub const ADO_API_URL: &str = "ADO_API_URL";
pub const SYNC_HTTP_TIMEOUT_SECS: &str = "SYNC_HTTP_TIMEOUT_SECS";

pub const DEFAULT_ENVIRONMENT_BLUEPRINT: &str = "azure_dev_ops_environment";
pub const DEFAULT_DEPLOYMENT_BLUEPRINT: &str = "azure_dev_ops_deployment";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Please set the following environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintConfig {
    pub environment: String,
    pub deployment: String,
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT_BLUEPRINT.to_string(),
            deployment: DEFAULT_DEPLOYMENT_BLUEPRINT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub ado: AdoConfig,
    pub port: PortConfig,
    pub blueprints: BlueprintConfig,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`. Empty values count as unset.
    /// All missing required variables are reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut required = |name: &'static str| {
            let value = get(name);
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };

        let organization = required(ADO_ORG);
        let pat = required(ADO_PAT);
        let client_id = required(PORT_CLIENT_ID);
        let client_secret = required(PORT_CLIENT_SECRET);

        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        let timeout = match get(SYNC_HTTP_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    name: SYNC_HTTP_TIMEOUT_SECS,
                    message: format!("'{}' is not a whole number of seconds", raw),
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        let config = Self {
            ado: AdoConfig::new(organization, pat)
                .with_base_url(get(ADO_API_URL).unwrap_or_else(|| DEFAULT_ADO_BASE_URL.to_string()))
                .with_timeout(timeout),
            port: PortConfig::new(client_id, client_secret)
                .with_base_url(
                    get(PORT_API_URL).unwrap_or_else(|| DEFAULT_PORT_BASE_URL.to_string()),
                )
                .with_timeout(timeout),
            blueprints: BlueprintConfig {
                environment: get(BLUEPRINT_ENV)
                    .unwrap_or_else(|| DEFAULT_ENVIRONMENT_BLUEPRINT.to_string()),
                deployment: get(BLUEPRINT_DEPLOYMENT)
                    .unwrap_or_else(|| DEFAULT_DEPLOYMENT_BLUEPRINT.to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ado
            .validate()
            .map_err(|message| ConfigError::InvalidValue {
                name: ADO_API_URL,
                message,
            })?;
        self.port
            .validate()
            .map_err(|message| ConfigError::InvalidValue {
                name: PORT_API_URL,
                message,
            })?;
        Ok(())
    }
}

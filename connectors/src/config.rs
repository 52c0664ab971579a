use std::fmt;
use std::time::Duration;

pub const DEFAULT_ADO_BASE_URL: &str = "https://dev.azure.com";
pub const DEFAULT_PORT_BASE_URL: &str = "https://api.getport.io/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Azure DevOps API version pinned on every read.
pub const ADO_API_VERSION: &str = "7.1";

fn validate_base_url(base_url: &str) -> Result<(), String> {
    if base_url.is_empty() {
        return Err("Base URL cannot be empty".to_string());
    }

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err("Base URL must start with http:// or https://".to_string());
    }

    Ok(())
}

#[derive(Clone)]
pub struct AdoConfig {
    pub base_url: String,
    pub organization: String,
    pub personal_access_token: String,
    pub timeout: Duration,
}

impl AdoConfig {
    pub fn new(organization: impl Into<String>, personal_access_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_ADO_BASE_URL.to_string(),
            organization: organization.into(),
            personal_access_token: personal_access_token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_base_url(&self.base_url)?;

        if self.organization.is_empty() {
            return Err("Organization cannot be empty".to_string());
        }

        if self.personal_access_token.is_empty() {
            return Err("Personal access token cannot be empty".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl fmt::Debug for AdoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdoConfig")
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("personal_access_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone)]
pub struct PortConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
    /// Tokens are refreshed once they are this close to expiry.
    pub refresh_margin: Duration,
}

impl PortConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_PORT_BASE_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout: DEFAULT_TIMEOUT,
            refresh_margin: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh_margin(mut self, refresh_margin: Duration) -> Self {
        self.refresh_margin = refresh_margin;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_base_url(&self.base_url)?;

        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err("Port client id and secret must both be set".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl fmt::Debug for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("refresh_margin", &self.refresh_margin)
            .finish()
    }
}

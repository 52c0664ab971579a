use crate::config::PortConfig;
use crate::provider::{ConnectorError, ConnectorResult, EntityCatalog};
use crate::types::{Blueprint, Entity};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

const SERVICE: &str = "Port";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Port has answered both `{"blueprints": [...]}` and `{"data": [...]}`.
#[derive(Debug, Clone, Deserialize)]
struct BlueprintsResponse {
    #[serde(default)]
    blueprints: Option<Vec<Blueprint>>,
    #[serde(default)]
    data: Option<Vec<Blueprint>>,
}

impl BlueprintsResponse {
    fn into_blueprints(self) -> Vec<Blueprint> {
        self.blueprints.or(self.data).unwrap_or_default()
    }
}

struct AccessToken {
    value: String,
    /// `None` when Port did not report a usable lifetime; such a token is
    /// kept until a 401 invalidates it.
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_usable(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now()
                .checked_add(margin)
                .is_some_and(|deadline| deadline < expires_at),
            None => true,
        }
    }
}

/// Client for the Port REST API.
///
/// The bearer token is fetched lazily, reused while it is valid and
/// re-acquired once it gets within `refresh_margin` of its expiry. A 401 from
/// any authenticated call drops the held token.
pub struct PortClient {
    client: reqwest::Client,
    config: PortConfig,
    token: Mutex<Option<AccessToken>>,
}

impl PortClient {
    pub fn new(config: PortConfig) -> ConnectorResult<Self> {
        config
            .validate()
            .map_err(|msg| ConnectorError::InvalidConfig { message: msg })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConnectorError::InvalidConfig {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    /// Builds `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> ConnectorResult<Url> {
        let mut url =
            Url::parse(&self.config.base_url).map_err(|e| ConnectorError::InvalidUrl {
                message: format!("{}: {}", self.config.base_url, e),
            })?;

        url.path_segments_mut()
            .map_err(|_| ConnectorError::InvalidUrl {
                message: format!("{} cannot be a base URL", self.config.base_url),
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Returns a valid bearer token, authenticating when none is held or the
    /// held one is about to expire.
    pub async fn access_token(&self) -> ConnectorResult<String> {
        let mut held = self.token.lock().await;

        if let Some(token) = held.as_ref() {
            if token.is_usable(self.config.refresh_margin) {
                return Ok(token.value.clone());
            }
            debug!("Port access token is about to expire, refreshing");
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *held = Some(token);
        Ok(value)
    }

    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn request_token(&self) -> ConnectorResult<AccessToken> {
        let url = self.endpoint(&["auth", "access_token"])?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(&AccessTokenRequest {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Authentication {
                message: format!("Port access token request failed ({}): {}", status, body),
            });
        }

        let parsed: AccessTokenResponse =
            response
                .json()
                .await
                .map_err(|e| ConnectorError::Authentication {
                    message: format!("Error parsing Port access token response: {}", e),
                })?;

        let value = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConnectorError::Authentication {
                message: "No accessToken found in Port API response".to_string(),
            })?;

        info!("Authenticated to Port");

        Ok(AccessToken {
            value,
            expires_at: parsed
                .expires_in
                .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs))),
        })
    }

    async fn authorized(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ConnectorResult<reqwest::RequestBuilder> {
        let token = self.access_token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> ConnectorResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 {
            self.invalidate_token().await;
            return Err(ConnectorError::Authentication {
                message: format!("Port rejected the access token: {}", body),
            });
        }

        Err(ConnectorError::Api {
            service: SERVICE,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl EntityCatalog for PortClient {
    async fn list_blueprints(&self) -> ConnectorResult<Vec<Blueprint>> {
        let url = self.endpoint(&["blueprints"])?;
        debug!("GET {}", url);

        let request = self.authorized(self.client.get(url)).await?;
        let response = self.check_status(request.send().await?).await?;
        let parsed: BlueprintsResponse = response.json().await?;

        let blueprints = parsed.into_blueprints();
        debug!("Retrieved {} blueprints", blueprints.len());
        Ok(blueprints)
    }

    async fn upsert_entity<R>(
        &self,
        blueprint: &str,
        entity: &Entity<R>,
    ) -> ConnectorResult<serde_json::Value>
    where
        R: Serialize + Send + Sync,
    {
        let url = self.endpoint(&["blueprints", blueprint, "entities"])?;
        debug!("POST {} ({})", url, entity.identifier);

        let request = self
            .client
            .post(url)
            .query(&[
                ("upsert", "true"),
                ("create_missing_related_entities", "false"),
            ])
            .json(entity);
        let request = self.authorized(request).await?;
        let response = self.check_status(request.send().await?).await?;

        Ok(response.json().await?)
    }

    fn catalog_name(&self) -> &'static str {
        "port"
    }
}

//! Azure DevOps REST reader.
//!
//! Covers the three reads the sync needs: projects of an organization,
//! environments of a project, and deployment records of an environment. Every
//! call is a single basic-auth GET (empty user name, PAT as password) pinned
//! to [`ADO_API_VERSION`]. Only the first page of each listing is consumed.

use crate::config::{AdoConfig, ADO_API_VERSION};
use crate::provider::{ConnectorError, ConnectorResult, InventorySource};
use crate::types::{DeploymentRecord, Environment, ListResponse, Project};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Response header Azure DevOps sets when more pages are available.
pub const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

const SERVICE: &str = "Azure DevOps";

pub struct AdoClient {
    client: reqwest::Client,
    config: AdoConfig,
}

impl AdoClient {
    pub fn new(config: AdoConfig) -> ConnectorResult<Self> {
        config
            .validate()
            .map_err(|msg| ConnectorError::InvalidConfig { message: msg })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConnectorError::InvalidConfig {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Builds `{base}/{org}/{segments...}?api-version=7.1`, percent-encoding
    /// each segment.
    fn api_url(&self, segments: &[&str]) -> ConnectorResult<Url> {
        let mut url =
            Url::parse(&self.config.base_url).map_err(|e| ConnectorError::InvalidUrl {
                message: format!("{}: {}", self.config.base_url, e),
            })?;

        url.path_segments_mut()
            .map_err(|_| ConnectorError::InvalidUrl {
                message: format!("{} cannot be a base URL", self.config.base_url),
            })?
            .pop_if_empty()
            .push(&self.config.organization)
            .extend(segments);

        url.query_pairs_mut()
            .append_pair("api-version", ADO_API_VERSION);

        Ok(url)
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> ConnectorResult<Vec<T>> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .basic_auth("", Some(&self.config.personal_access_token))
            .send()
            .await
            .map_err(Self::handle_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ConnectorError::Authentication {
                    message: format!("{} rejected the personal access token ({})", SERVICE, status),
                },
                code => ConnectorError::Api {
                    service: SERVICE,
                    status: code,
                    body,
                },
            });
        }

        if let Some(token) = response.headers().get(CONTINUATION_HEADER) {
            warn!(
                "{} returned a continuation token ({:?}) for {}; only the first page is synced",
                SERVICE, token, url
            );
        }

        let list: ListResponse<T> = response.json().await.map_err(Self::handle_http_error)?;
        Ok(list.value)
    }

    fn handle_http_error(err: reqwest::Error) -> ConnectorError {
        match err.status().map(|s| s.as_u16()) {
            Some(401) | Some(403) => ConnectorError::Authentication {
                message: err.to_string(),
            },
            _ => ConnectorError::Network(err),
        }
    }
}

#[async_trait]
impl InventorySource for AdoClient {
    async fn list_projects(&self) -> ConnectorResult<Vec<Project>> {
        let url = self.api_url(&["_apis", "projects"])?;
        let projects: Vec<Project> = self.get_list(url).await?;
        info!(
            "Retrieved {} projects from organization {}",
            projects.len(),
            self.config.organization
        );
        Ok(projects)
    }

    async fn list_environments(&self, project: &str) -> ConnectorResult<Vec<Environment>> {
        let url = self.api_url(&[project, "_apis", "distributedtask", "environments"])?;
        let environments: Vec<Environment> = self.get_list(url).await?;
        debug!(
            "Retrieved {} environments for project {}",
            environments.len(),
            project
        );
        Ok(environments)
    }

    async fn list_deployment_records(
        &self,
        project: &str,
        environment_id: &str,
    ) -> ConnectorResult<Vec<DeploymentRecord>> {
        let url = self.api_url(&[
            project,
            "_apis",
            "distributedtask",
            "environments",
            environment_id,
            "environmentdeploymentrecords",
        ])?;
        let records: Vec<DeploymentRecord> = self.get_list(url).await?;
        debug!(
            "Retrieved {} deployment records for environment {} in project {}",
            records.len(),
            environment_id,
            project
        );
        Ok(records)
    }

    fn source_name(&self) -> &'static str {
        "azure-devops"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceId;
    use mockito::Matcher;

    // base64(":pat")
    const BASIC_AUTH: &str = "Basic OnBhdA==";

    fn client_for(server: &mockito::Server) -> AdoClient {
        AdoClient::new(AdoConfig::new("contoso", "pat").with_base_url(server.url())).unwrap()
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let result = AdoClient::new(AdoConfig::new("", "pat"));
        assert!(matches!(result, Err(ConnectorError::InvalidConfig { .. })));
    }

    #[test]
    fn test_api_url_encodes_segments() {
        let client = AdoClient::new(AdoConfig::new("contoso", "pat")).unwrap();
        let url = client
            .api_url(&["My Project", "_apis", "distributedtask", "environments"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/My%20Project/_apis/distributedtask/environments?api-version=7.1"
        );
    }

    #[test]
    fn test_api_url_tolerates_trailing_slash() {
        let client = AdoClient::new(
            AdoConfig::new("contoso", "pat").with_base_url("https://ado.example.com/"),
        )
        .unwrap();
        let url = client.api_url(&["_apis", "projects"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://ado.example.com/contoso/_apis/projects?api-version=7.1"
        );
    }

    #[tokio::test]
    async fn test_list_projects() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/contoso/_apis/projects")
            .match_query(Matcher::UrlEncoded("api-version".into(), "7.1".into()))
            .match_header("authorization", BASIC_AUTH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"count":2,"value":[{"id":"p-1","name":"alpha"},{"id":"p-2","name":"beta"}]}"#)
            .create_async()
            .await;

        let projects = client_for(&server).list_projects().await.unwrap();
        mock.assert_async().await;
        assert_eq!(
            projects,
            vec![Project::new("p-1", "alpha"), Project::new("p-2", "beta")]
        );
    }

    #[tokio::test]
    async fn test_list_environments_without_value_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/alpha/_apis/distributedtask/environments")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let environments = client_for(&server).list_environments("alpha").await.unwrap();
        assert!(environments.is_empty());
    }

    #[tokio::test]
    async fn test_list_deployment_records() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/contoso/alpha/_apis/distributedtask/environments/10/environmentdeploymentrecords",
            )
            .match_query(Matcher::UrlEncoded("api-version".into(), "7.1".into()))
            .with_status(200)
            .with_header(CONTINUATION_HEADER, "next-page")
            .with_body(r#"{"value":[{"id":99,"owner":{"id":55},"definition":{"id":7}}]}"#)
            .create_async()
            .await;

        let records = client_for(&server)
            .list_deployment_records("alpha", "10")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, SourceId::Number(99));
        assert_eq!(records[0].pipeline_id().as_deref(), Some("7"));
        assert_eq!(records[0].build_id().as_deref(), Some("55"));
    }

    #[tokio::test]
    async fn test_deployment_records_tolerate_null_value_and_bare_references() {
        let mut server = mockito::Server::new_async().await;
        let _null = server
            .mock(
                "GET",
                "/contoso/alpha/_apis/distributedtask/environments/10/environmentdeploymentrecords",
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"count":0,"value":null}"#)
            .create_async()
            .await;
        let _bare = server
            .mock(
                "GET",
                "/contoso/alpha/_apis/distributedtask/environments/11/environmentdeploymentrecords",
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"value":[{"id":5,"owner":{},"definition":{"id":7}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);

        let records = client.list_deployment_records("alpha", "10").await.unwrap();
        assert!(records.is_empty());

        let records = client.list_deployment_records("alpha", "11").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].build_id(), None);
        assert_eq!(records[0].pipeline_id().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/_apis/projects")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let result = client_for(&server).list_projects().await;
        match result {
            Err(ConnectorError::Api { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/_apis/projects")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let result = client_for(&server).list_projects().await;
        assert!(matches!(result, Err(ConnectorError::Authentication { .. })));
    }

    #[tokio::test]
    async fn test_invalid_json_is_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/contoso/_apis/projects")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not valid json")
            .create_async()
            .await;

        let result = client_for(&server).list_projects().await;
        assert!(matches!(result, Err(ConnectorError::Network(_))));
    }
}

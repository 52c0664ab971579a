use crate::types::{Blueprint, DeploymentRecord, Entity, Environment, Project};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("{service} API error ({status}): {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid URL: {message}")]
    InvalidUrl { message: String },
}

impl ConnectorError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, ConnectorError::Authentication { .. })
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Read side of the sync: the source inventory.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_projects(&self) -> ConnectorResult<Vec<Project>>;

    async fn list_environments(&self, project: &str) -> ConnectorResult<Vec<Environment>>;

    async fn list_deployment_records(
        &self,
        project: &str,
        environment_id: &str,
    ) -> ConnectorResult<Vec<DeploymentRecord>>;

    fn source_name(&self) -> &'static str;
}

/// Write side of the sync: the catalog receiving entities.
#[async_trait]
pub trait EntityCatalog: Send + Sync {
    async fn list_blueprints(&self) -> ConnectorResult<Vec<Blueprint>>;

    async fn upsert_entity<R>(
        &self,
        blueprint: &str,
        entity: &Entity<R>,
    ) -> ConnectorResult<serde_json::Value>
    where
        R: Serialize + Send + Sync;

    fn catalog_name(&self) -> &'static str;
}

pub mod ado;
pub mod config;
pub mod port;
pub mod provider;
pub mod types;

pub use ado::AdoClient;
pub use config::{AdoConfig, PortConfig};
pub use port::PortClient;
pub use provider::{ConnectorError, ConnectorResult, EntityCatalog, InventorySource};
pub use types::{
    Blueprint, DeploymentEntity, DeploymentRecord, DeploymentRelations, Entity, Environment,
    EnvironmentEntity, EnvironmentRelations, ListResponse, Project, ProjectReference, Reference,
    SourceId,
};

//! Sync entrypoint.
//!
//! A run is strictly sequential: check blueprints, walk projects ->
//! environments -> deployment records building payloads, then upsert every
//! environment followed by every deployment. Read failures abort the run;
//! upsert failures are recorded and the loop moves on.

use crate::blueprints::{check_blueprints, BlueprintCheck};
use crate::config::{BlueprintConfig, ConfigError, SyncConfig};
use crate::transform::EntitySet;
use connectors::{
    AdoClient, ConnectorError, ConnectorResult, Entity, EntityCatalog, InventorySource, PortClient,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const EXIT_CONFIG: u8 = 1;
pub const EXIT_FATAL: u8 = 2;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

impl SyncError {
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) => EXIT_CONFIG,
            SyncError::Connector(ConnectorError::InvalidConfig { .. }) => EXIT_CONFIG,
            SyncError::Connector(_) => EXIT_FATAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertFailure {
    pub blueprint: String,
    pub identifier: String,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub blueprints: BlueprintCheck,
    pub projects: usize,
    pub environments: usize,
    pub deployments: usize,
    pub environments_upserted: usize,
    pub deployments_upserted: usize,
    pub failures: Vec<UpsertFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Walks the source inventory and builds every payload. The first failing
/// read aborts the walk.
pub async fn collect_entities<S: InventorySource>(
    source: &S,
) -> ConnectorResult<(usize, EntitySet)> {
    let mut entities = EntitySet::new();

    info!("Fetching projects from {}...", source.source_name());
    let projects = source.list_projects().await?;

    for project in &projects {
        info!("Processing project: {}", project.name);

        for environment in source.list_environments(&project.name).await? {
            let environment_id = environment.id.to_string();
            entities.add_environment(&environment);
            info!(
                "Processing environment ID: {} in project {}",
                environment_id, project.name
            );

            let records = source
                .list_deployment_records(&project.name, &environment_id)
                .await?;
            for record in &records {
                entities.add_deployment(&environment, record);
            }
        }
    }

    Ok((projects.len(), entities))
}

async fn upsert_each<C, R>(
    catalog: &C,
    blueprint: &str,
    kind: &str,
    entities: &[Entity<R>],
    failures: &mut Vec<UpsertFailure>,
) -> usize
where
    C: EntityCatalog,
    R: Serialize + Send + Sync,
{
    let mut upserted = 0;

    for entity in entities {
        info!("Upserting {} {}...", kind, entity.title);
        match catalog.upsert_entity(blueprint, entity).await {
            Ok(_) => upserted += 1,
            Err(e) => {
                warn!("Error upserting {} {}: {}", kind, entity.title, e);
                failures.push(UpsertFailure {
                    blueprint: blueprint.to_string(),
                    identifier: entity.identifier.clone(),
                    title: entity.title.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    upserted
}

/// Upserts all environments, then all deployments. Every entity is attempted
/// regardless of earlier failures.
pub async fn upsert_entities<C: EntityCatalog>(
    catalog: &C,
    blueprints: &BlueprintConfig,
    entities: &EntitySet,
    report: &mut SyncReport,
) {
    info!("Begin upserting environments and deployments to Port...");
    report.environments_upserted = upsert_each(
        catalog,
        &blueprints.environment,
        "environment",
        &entities.environments,
        &mut report.failures,
    )
    .await;
    report.deployments_upserted = upsert_each(
        catalog,
        &blueprints.deployment,
        "deployment",
        &entities.deployments,
        &mut report.failures,
    )
    .await;
}

pub async fn run_sync<S, C>(
    source: &S,
    catalog: &C,
    blueprints: &BlueprintConfig,
) -> Result<SyncReport, SyncError>
where
    S: InventorySource,
    C: EntityCatalog,
{
    info!("Starting Azure DevOps environments and deployments sync to Port...");

    let mut report = SyncReport {
        blueprints: check_blueprints(catalog, blueprints).await?,
        ..SyncReport::default()
    };

    let (projects, entities) = collect_entities(source).await?;
    report.projects = projects;
    report.environments = entities.environments.len();
    report.deployments = entities.deployments.len();

    upsert_entities(catalog, blueprints, &entities, &mut report).await;

    info!("Sync complete.");
    Ok(report)
}

/// Builds the HTTP clients from `config` and runs a full sync.
pub async fn run(config: &SyncConfig) -> Result<SyncReport, SyncError> {
    let source = AdoClient::new(config.ado.clone())?;
    let catalog = PortClient::new(config.port.clone())?;
    run_sync(&source, &catalog, &config.blueprints).await
}

/// Reads the source inventory and returns the payloads without contacting
/// the catalog.
pub async fn dry_run(config: &SyncConfig) -> Result<EntitySet, SyncError> {
    let source = AdoClient::new(config.ado.clone())?;
    let (_, entities) = collect_entities(&source).await?;
    Ok(entities)
}

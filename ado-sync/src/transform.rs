//! Conversion of Azure DevOps records into Port entity payloads.

use connectors::{
    DeploymentEntity, DeploymentRecord, DeploymentRelations, Entity, Environment,
    EnvironmentEntity, EnvironmentRelations,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

pub fn environment_entity(environment: &Environment) -> EnvironmentEntity {
    Entity::new(
        environment.id.to_string(),
        environment.name.clone(),
        EnvironmentRelations {
            project: environment.project_id().map(str::to_string),
            pipeline: Vec::new(),
        },
    )
}

pub fn deployment_entity(environment: &Environment, record: &DeploymentRecord) -> DeploymentEntity {
    Entity::new(
        record.id.to_string(),
        format!("{}-{}", environment.name, record.id),
        DeploymentRelations {
            environment: environment.id.to_string(),
            pipeline: record.pipeline_id(),
            build: record.build_id(),
        },
    )
}

/// The entities built during one run, in traversal order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntitySet {
    pub environments: Vec<EnvironmentEntity>,
    pub deployments: Vec<DeploymentEntity>,
    /// Environment identifier -> position in `environments`.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty() && self.deployments.is_empty()
    }

    pub fn environment(&self, identifier: &str) -> Option<&EnvironmentEntity> {
        self.index
            .get(identifier)
            .map(|&position| &self.environments[position])
    }

    /// Adds the payload for `environment`. An environment seen twice keeps its
    /// first payload so identifiers stay unique.
    pub fn add_environment(&mut self, environment: &Environment) {
        let entity = environment_entity(environment);
        if self.index.contains_key(&entity.identifier) {
            warn!(
                "Environment {} was listed more than once; keeping the first occurrence",
                entity.identifier
            );
            return;
        }
        self.index
            .insert(entity.identifier.clone(), self.environments.len());
        self.environments.push(entity);
    }

    /// Adds the payload for `record` and links its pipeline to the owning
    /// environment, which must already have been added.
    pub fn add_deployment(&mut self, environment: &Environment, record: &DeploymentRecord) {
        let entity = deployment_entity(environment, record);

        if let Some(pipeline_id) = &entity.relations.pipeline {
            match self.index.get(&entity.relations.environment) {
                Some(&position) => {
                    self.environments[position]
                        .relations
                        .add_pipeline(pipeline_id.clone());
                }
                None => warn!(
                    "Deployment {} references unknown environment {}",
                    entity.identifier, entity.relations.environment
                ),
            }
        }

        self.deployments.push(entity);
    }
}

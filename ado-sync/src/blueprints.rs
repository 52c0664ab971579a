use crate::config::BlueprintConfig;
use connectors::{ConnectorResult, EntityCatalog};
use serde::Serialize;
use tracing::{info, warn};

/// Which of the configured blueprints exist in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlueprintCheck {
    pub environment_found: bool,
    pub deployment_found: bool,
}

impl BlueprintCheck {
    pub fn all_found(&self) -> bool {
        self.environment_found && self.deployment_found
    }
}

/// Looks up both blueprints in the catalog and logs the outcome. Missing
/// blueprints are reported but do not fail the check; only the fetch itself
/// can fail.
pub async fn check_blueprints<C: EntityCatalog>(
    catalog: &C,
    blueprints: &BlueprintConfig,
) -> ConnectorResult<BlueprintCheck> {
    info!("Validating blueprints...");
    let available = catalog.list_blueprints().await?;

    let found = |identifier: &str| available.iter().any(|bp| bp.identifier == identifier);
    let check = BlueprintCheck {
        environment_found: found(&blueprints.environment),
        deployment_found: found(&blueprints.deployment),
    };

    for (kind, identifier, present) in [
        ("environment", &blueprints.environment, check.environment_found),
        ("deployment", &blueprints.deployment, check.deployment_found),
    ] {
        if present {
            info!("Found {} blueprint: {}", kind, identifier);
        } else {
            warn!(
                "{} blueprint {} not found in {}; upserts into it are likely to fail",
                kind,
                identifier,
                catalog.catalog_name()
            );
        }
    }

    Ok(check)
}

pub mod blueprints;
pub mod config;
pub mod driver;
pub mod transform;

pub use blueprints::{check_blueprints, BlueprintCheck};
pub use config::{BlueprintConfig, ConfigError, SyncConfig};
pub use driver::{
    collect_entities, dry_run, run, run_sync, upsert_entities, SyncError, SyncReport,
    UpsertFailure, EXIT_CONFIG, EXIT_FATAL,
};
pub use transform::{deployment_entity, environment_entity, EntitySet};

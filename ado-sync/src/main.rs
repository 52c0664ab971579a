use ado_sync::{dry_run, run, SyncConfig, EXIT_CONFIG, EXIT_FATAL};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ado-port-sync")]
#[command(about = "Sync Azure DevOps environments and deployment records into Port")]
struct Cli {
    /// Read from Azure DevOps and print the entity payloads without calling Port
    #[arg(long)]
    dry_run: bool,
    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if cli.dry_run {
        return match dry_run(&config).await {
            Ok(entities) => match serde_json::to_string_pretty(&entities) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Failed to render payloads: {}", e);
                    ExitCode::from(EXIT_FATAL)
                }
            },
            Err(e) => {
                error!("Dry run failed: {}", e);
                ExitCode::from(e.exit_code())
            }
        };
    }

    match run(&config).await {
        Ok(report) => {
            info!(
                projects = report.projects,
                environments = report.environments_upserted,
                deployments = report.deployments_upserted,
                failures = report.failures.len(),
                "Sync finished"
            );
            if !report.is_clean() {
                warn!(
                    "{} entities failed to upsert: {}",
                    report.failures.len(),
                    report
                        .failures
                        .iter()
                        .map(|f| format!("{}/{}", f.blueprint, f.identifier))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Sync failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

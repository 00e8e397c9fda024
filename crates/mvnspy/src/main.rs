//! mvnspy: publish test reports, fingerprints and artifacts from a Maven
//! spy log into the run store.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use mvnspy::config::{Command, Config, JobConfig};
use mvnspy::context::RunHandle;
use mvnspy::db::SqliteStore;
use mvnspy::env::EnvVars;
use mvnspy::recorder::RunRecorder;
use mvnspy::registry::PublisherRegistry;
use mvnspy::step::{Build, StepSpec};
use mvnspy::workspace::LocalWorkspace;
use mvnspy_events::parse_spy_log;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(config.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;
    let database = config.database_path();
    debug!(database = %database.display(), "Opening run store");
    let store = Arc::new(
        SqliteStore::open(&database)
            .with_context(|| format!("Cannot open database {}", database.display()))?,
    );

    match config.command {
        Some(Command::Publish {
            ref spy_log,
            ref job,
            ref run,
            ref node,
        }) => {
            let job = match job {
                Some(path) => JobConfig::from_file(path)?,
                None => JobConfig::default(),
            };
            let xml = std::fs::read_to_string(spy_log)
                .with_context(|| format!("Cannot read spy log {}", spy_log.display()))?;
            let log = parse_spy_log(&xml)
                .with_context(|| format!("Cannot parse spy log {}", spy_log.display()))?;
            let started_at = log.started_at().unwrap_or_else(chrono::Utc::now);
            let run = match run {
                Some(id) => RunHandle::new(id, started_at),
                None => RunHandle {
                    started_at,
                    ..RunHandle::start()
                },
            };

            let root = config
                .workspace_path()
                .context("Cannot determine the workspace directory")?;
            let workspace = Arc::new(LocalWorkspace::new(&root)?);

            info!(run_id = %run.id, node_id = %node, "Publishing spy log");
            let build = Build::new(run, store.clone(), store, PublisherRegistry::with_defaults());
            let result = build
                .run_step(
                    &job,
                    StepSpec {
                        node_id: node.clone(),
                        spy_log: log.into(),
                        workspace,
                        env: EnvVars::from_process(),
                    },
                )
                .await;

            for line in build.log().lines() {
                eprintln!("{line}");
            }
            let outcome = result?;
            let report = serde_json::json!({
                "run": build.run().id,
                "result": outcome.result,
                "stats": outcome.stats,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Command::Show { ref run }) => {
            let artifacts = store.artifacts(run).await?;
            println!("{}", serde_json::to_string_pretty(&artifacts)?);
        }
        None => {
            let runs = store.run_ids()?;
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }
    }

    Ok(())
}

//! Command line entry points for sensorflow.
//!
//! Usage:
//!   sensorflow train
//!   sensorflow predict
//!   sensorflow stage model-trainer --run-dir artifact/10_19_2026_14_03_59
//!   sensorflow upload readings.csv
//!   sensorflow resolve

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use sensorflow::config::{BatchPredictionConfig, Schema, Settings};
use sensorflow::core::StageName;
use sensorflow::data::read_csv;
use sensorflow::events::{EventSink, LoggingEventSink};
use sensorflow::observability::init_logging;
use sensorflow::pipeline::TrainingPipeline;
use sensorflow::prediction::BatchPrediction;
use sensorflow::registry::{DeployedModel, ModelResolver};
use sensorflow::store::{CsvDocumentStore, DocumentStore};
use sensorflow::sync::{self, RemoteSync};

const ARTIFACT_PREFIX: &str = "artifact";
const SAVED_MODELS_PREFIX: &str = "saved_models";
const INBOX_PREFIX: &str = "inbox";

#[derive(Parser)]
#[command(name = "sensorflow")]
#[command(about = "Train, deploy and serve the sensor fault classifier")]
struct Cli {
    /// Settings YAML file
    #[arg(short, long, env = "SENSORFLOW_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every training stage in a new run directory
    Train,
    /// Score every CSV waiting in the inbox
    Predict,
    /// Run one stage inside an existing run directory
    Stage {
        /// Stage name, e.g. data-validation
        name: StageName,
        /// Run directory holding the inbound artifacts
        #[arg(long)]
        run_dir: PathBuf,
    },
    /// Load a CSV file into the document store
    Upload {
        /// CSV file to import
        file: PathBuf,
        /// Target database (defaults to the configured one)
        #[arg(long)]
        database: Option<String>,
        /// Target collection (defaults to the configured one)
        #[arg(long)]
        collection: Option<String>,
    },
    /// Show the latest deployed model version
    Resolve,
}

fn event_sink() -> Arc<dyn EventSink> {
    Arc::new(LoggingEventSink::default())
}

fn open_store(settings: &Settings) -> Arc<CsvDocumentStore> {
    Arc::new(CsvDocumentStore::new(&settings.store.uri))
}

fn load_schema(settings: &Settings) -> anyhow::Result<Schema> {
    Schema::from_file(&settings.paths.schema_file)
        .with_context(|| format!("loading schema '{}'", settings.paths.schema_file.display()))
}

async fn train(settings: Settings, remote: &dyn RemoteSync) -> anyhow::Result<()> {
    let schema = load_schema(&settings)?;
    let store = open_store(&settings);
    let artifact_root = settings.paths.artifact_root.clone();
    let saved_models_root = settings.paths.saved_models_root.clone();

    let pipeline = TrainingPipeline::new(settings, schema, store.clone()).with_event_sink(event_sink());
    let outcome = pipeline.start().await;
    if let Err(e) = store.close().await {
        warn!(error = %e, "closing document store failed");
    }
    let summary = outcome.context("training run failed")?;

    sync::push_logged(remote, &artifact_root, ARTIFACT_PREFIX).await;
    if summary.pushed_version.is_some() {
        sync::push_logged(remote, &saved_models_root, SAVED_MODELS_PREFIX).await;
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn predict(settings: &Settings, remote: &dyn RemoteSync) -> anyhow::Result<()> {
    let config = BatchPredictionConfig::new(settings);
    sync::pull_logged(remote, INBOX_PREFIX, &config.inbox_dir).await;

    let report = BatchPrediction::new(config)
        .with_event_sink(event_sink())
        .run()
        .await
        .context("batch prediction failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_clean() {
        bail!("{} file(s) could not be predicted", report.failures.len());
    }
    Ok(())
}

async fn run_stage(settings: Settings, name: StageName, run_dir: PathBuf) -> anyhow::Result<()> {
    let schema = load_schema(&settings)?;
    let store = open_store(&settings);
    let pipeline = TrainingPipeline::new(settings, schema, store.clone()).with_event_sink(event_sink());
    let outcome = pipeline.run_stage(&run_dir, name).await;
    if let Err(e) = store.close().await {
        warn!(error = %e, "closing document store failed");
    }
    let summary = outcome.with_context(|| format!("stage {name} failed in '{}'", run_dir.display()))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn upload(
    settings: &Settings,
    file: PathBuf,
    database: Option<String>,
    collection: Option<String>,
) -> anyhow::Result<()> {
    let database = database.unwrap_or_else(|| settings.store.database.clone());
    let collection = collection.unwrap_or_else(|| settings.store.collection.clone());
    let records = read_csv(&file).with_context(|| format!("reading '{}'", file.display()))?;

    let store = open_store(settings);
    let inserted = store
        .import_records(&database, &collection, records)
        .await
        .with_context(|| format!("importing into {database}.{collection}"))?;
    store.close().await?;
    info!(inserted, database = %database, collection = %collection, "upload complete");
    println!("inserted {inserted} records into {database}.{collection}");
    Ok(())
}

fn resolve(settings: &Settings) -> anyhow::Result<()> {
    let resolver = ModelResolver::new(&settings.paths.saved_models_root);
    match resolver.latest()? {
        Some(resolved) => {
            let deployed = DeployedModel::load(&resolved)
                .with_context(|| format!("loading version {}", resolved.version))?;
            println!(
                "version {} at {} (classes: {})",
                deployed.version,
                resolved.dir.display(),
                deployed.target_encoder.classes().join(", ")
            );
        }
        None => println!(
            "no deployed model under {}",
            settings.paths.saved_models_root.display()
        ),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(log_file) = init_logging(&settings.logging)? {
        info!(log_file = %log_file.display(), "logging to file");
    }
    let remote = sync::from_settings(&settings.sync);

    match cli.command {
        Command::Train => train(settings, remote.as_ref()).await,
        Command::Predict => predict(&settings, remote.as_ref()).await,
        Command::Stage { name, run_dir } => run_stage(settings, name, run_dir).await,
        Command::Upload {
            file,
            database,
            collection,
        } => upload(&settings, file, database, collection).await,
        Command::Resolve => resolve(&settings),
    }
}

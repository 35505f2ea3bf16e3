use clap::{Parser, Subcommand};
use flowsync::compiler::Compiler;
use flowsync::config::Settings;
use flowsync::model::loader::{load_graph_from_yaml, serialize_graph};
use flowsync::runtime::coordinator::{DeploymentCoordinator, RoutingOutcome, TaskRoutingUpdate};
use flowsync::runtime::engine::{DeploymentEngine, InMemoryEngine};
use flowsync::runtime::redis_engine::RedisEngine;
use flowsync::runtime::notify::{TaskReachedHandler, TracingNotifier};
use flowsync::runtime::storage::{FormRecord, InMemoryMetadataStore, MetadataStore};
use flowsync::runtime::redis_storage::RedisMetadataStore;
use std::sync::Arc;
use std::path::PathBuf;
use std::fs;
use anyhow::{Result, Context as AnyhowContext};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Redis connection URL for the metadata store and engine (in-memory when absent)
    #[arg(long, global = true)]
    redis: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a graph and print it with routing and bindings injected
    Check {
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Deploy a new workflow
    Deploy {
        #[arg(long, short)]
        file: PathBuf,

        #[arg(long, short)]
        name: String,
    },

    /// Replace the graph of an existing workflow and deploy it again
    Redeploy {
        /// Workflow record id
        #[arg(long)]
        id: String,

        #[arg(long, short)]
        file: PathBuf,

        #[arg(long, short)]
        name: String,
    },

    /// Store a form schema (JSON) under a form key
    Form {
        #[arg(long, short)]
        key: String,

        #[arg(long, short)]
        file: PathBuf,

        #[arg(long = "type")]
        form_type: Option<String>,
    },

    /// Assign a user task, sync its decision form and redeploy
    Route {
        #[arg(long)]
        deployment: String,

        #[arg(long)]
        task: String,

        #[arg(long)]
        form_key: String,

        #[arg(long)]
        assignee: Option<String>,

        /// Deployment id returned by the previous routing update
        #[arg(long)]
        last_deployment: Option<String>,
    },

    /// Send the task-reached notification for a task
    Notify {
        #[arg(long, short)]
        task: String,
    },
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(redis) = &cli.redis {
        settings.storage.redis_url = Some(redis.clone());
    }
    Ok(settings)
}

fn build_store(settings: &Settings) -> Result<Arc<dyn MetadataStore>> {
    match &settings.storage.redis_url {
        Some(url) => {
            info!("Using Redis metadata store: {}", url);
            let client = redis::Client::open(url.as_str()).context("Invalid Redis URL")?;
            Ok(Arc::new(RedisMetadataStore::new(client, settings.storage.key_prefix.clone())))
        }
        None => {
            warn!("No Redis configured, metadata is kept in memory for this run only");
            Ok(Arc::new(InMemoryMetadataStore::new()))
        }
    }
}

fn build_engine(settings: &Settings) -> Result<Arc<dyn DeploymentEngine>> {
    match &settings.storage.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid Redis URL")?;
            Ok(Arc::new(RedisEngine::new(client, &settings.storage.key_prefix)))
        }
        None => {
            warn!("No Redis configured, deployments are kept in memory for this run only");
            Ok(Arc::new(InMemoryEngine::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Check { file } => {
            let mut graph = load_graph_from_yaml(&file)?;
            let compiler = Compiler::new(settings.bindings.clone());
            compiler.prepare(&mut graph)?;
            println!("{}", serialize_graph(&graph)?);
        }

        Commands::Deploy { file, name } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read graph file from {}", file.display()))?;
            let coordinator = DeploymentCoordinator::with_bindings(
                build_engine(&settings)?, build_store(&settings)?, settings.bindings.clone());

            let record = coordinator.deploy_new(&name, &text).await?;
            info!(workflow_id = %record.id, "Deployed");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Redeploy { id, file, name } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read graph file from {}", file.display()))?;
            let coordinator = DeploymentCoordinator::with_bindings(
                build_engine(&settings)?, build_store(&settings)?, settings.bindings.clone());

            let record = coordinator.redeploy(&id, &text, &name).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Form { key, file, form_type } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read form file from {}", file.display()))?;
            flowsync::forms::FormSchema::parse(&key, &content)?;

            let store = build_store(&settings)?;
            let existing = store.find_form_by_key(&key).await?;
            let record = FormRecord {
                id: existing.map(|f| f.id).unwrap_or_default(),
                form_key: key,
                form_type,
                content,
            };
            let record = store.save_form(record).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Route { deployment, task, form_key, assignee, last_deployment } => {
            let coordinator = DeploymentCoordinator::with_bindings(
                build_engine(&settings)?, build_store(&settings)?, settings.bindings.clone());

            let outcome = coordinator.update_task_routing(TaskRoutingUpdate {
                deployment_id: deployment,
                task_id: task,
                form_key,
                assignee,
                last_known_deployment_id: last_deployment,
            }).await?;

            match &outcome {
                RoutingOutcome::FormUpdated { form, .. } => info!(form_key = %form.form_key, "Decision form updated"),
                RoutingOutcome::NoGatewayFollows { .. } => info!("No gateway follows the task, form unchanged"),
            }
            println!("{}", serde_json::to_string_pretty(outcome.workflow())?);
        }

        Commands::Notify { task } => {
            let handler = TaskReachedHandler::new(Arc::new(TracingNotifier), settings.notification.recipient.clone());
            handler.on_task_reached(&task).await;
        }
    }

    Ok(())
}

//! Ask one question against one dataset and print the events as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use graph_qa::{
    Dataset, EventKind, HttpBackends, OrchestratorConfig, QueryOrchestrator, RunOutcome,
};

#[derive(Parser)]
#[command(name = "graph-qa")]
#[command(about = "Answer a natural-language question from a SPARQL endpoint")]
#[command(group(ArgGroup::new("source").required(true).args(["dataset", "endpoint"])))]
struct Cli {
    /// Dataset descriptor (JSON)
    #[arg(long, value_name = "FILE")]
    dataset: Option<PathBuf>,

    /// SPARQL endpoint URL
    #[arg(long, value_name = "URL", requires = "dictionary")]
    endpoint: Option<String>,

    /// Dictionary URL
    #[arg(long, value_name = "URL", requires = "endpoint")]
    dictionary: Option<String>,

    /// Log every event and enable debug logging for this crate
    #[arg(long)]
    debug: bool,

    /// Run identifier used in logs (defaults to a fresh UUID)
    #[arg(long)]
    run_id: Option<String>,

    /// The question to answer
    question: String,
}

fn load_dataset(cli: &Cli) -> Result<Dataset> {
    if let Some(path) = &cli.dataset {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("Invalid dataset descriptor {}", path.display()));
    }

    match (&cli.endpoint, &cli.dictionary) {
        (Some(endpoint), Some(dictionary)) => Ok(Dataset::new("cli", endpoint, dictionary)),
        _ => bail!("either --dataset or both --endpoint and --dictionary are required"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "info,graph_qa=debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = OrchestratorConfig::from_env().with_debug(cli.debug);
    let dataset = load_dataset(&cli)?;
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let backends = HttpBackends::new().context("Failed to build HTTP client")?;

    let orchestrator = QueryOrchestrator::new(
        dataset,
        cli.question.clone(),
        run_id,
        config,
        Arc::new(backends),
    );

    orchestrator.on(&EventKind::ALL, |event| match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
    });

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling run");
            cancel.cancel();
        }
    });

    match orchestrator.perform().await? {
        RunOutcome::Completed(stats) => {
            tracing::info!(sparqls = stats.map_or(0, |s| s.sparqls), "Run completed");
        }
        RunOutcome::Cancelled => tracing::info!("Run cancelled"),
        RunOutcome::Aborted { endpoint } => {
            tracing::warn!(endpoint = %endpoint, "Run aborted by a persistent endpoint error");
        }
        RunOutcome::GatewayError(failure) => bail!("{}", failure.message()),
        RunOutcome::Failed(message) => bail!("run failed: {message}"),
    }

    Ok(())
}

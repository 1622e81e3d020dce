use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use genflow::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Validate and run node-based content generation pipelines
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON config file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the execution order and any discarded edges
    Validate {
        /// Pipeline JSON file
        path: PathBuf,
    },
    /// Run a pipeline and print the result as JSON
    Run {
        /// Pipeline JSON file
        path: PathBuf,
        /// Generate through DashScope directly instead of the node API
        #[arg(long)]
        direct: bool,
    },
    /// Print a built-in template as pipeline JSON
    Template {
        /// Template id, e.g. `ai-pet`
        id: String,
    },
    /// List built-in templates
    Templates,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<GenflowConfig> {
    let mut config = match path {
        Some(path) => GenflowConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GenflowConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

fn load_graph(path: &Path) -> Result<PipelineGraph> {
    let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let graph = PipelineGraph::from_json(&json).with_context(|| format!("invalid pipeline in {}", path.display()))?;
    for discarded in graph.discarded() {
        eprintln!("warning: discarded edge {}: {}", discarded.edge.id, discarded.reason);
    }
    Ok(graph)
}

fn validate(path: &Path) -> Result<()> {
    let graph = load_graph(path)?;
    let order = graph.execution_order()?;
    println!("{} nodes, {} edges", graph.node_count(), graph.edge_count());
    for (index, node_id) in order.iter().enumerate() {
        let kind = graph.node(node_id).map(Node::kind);
        match kind {
            Some(kind) if kind.is_runnable() => println!("{:>3}. {node_id} ({kind}, remote)", index + 1),
            Some(kind) => println!("{:>3}. {node_id} ({kind})", index + 1),
            None => println!("{:>3}. {node_id}", index + 1),
        }
    }
    if !graph.discarded().is_empty() {
        bail!("{} edge(s) were discarded", graph.discarded().len());
    }
    Ok(())
}

async fn run(path: &Path, direct: bool, config: &GenflowConfig) -> Result<()> {
    let graph = load_graph(path)?;

    let executor: Arc<dyn NodeExecutor> = if direct {
        let client = DashScopeClient::new(config.dashscope.clone(), config.request_timeout())?;
        Arc::new(
            ServiceNodeExecutor::new(Arc::new(client))
                .with_image_poll(config.image_poll.clone())
                .with_video_poll(config.video_poll.clone()),
        )
    } else {
        Arc::new(HttpNodeExecutor::from_config(config)?)
    };
    info!(direct, nodes = graph.node_count(), "Starting pipeline");

    let runner = PipelineRunner::new(executor, Arc::new(ExecutionStore::new()))
        .with_event_sink(Arc::new(LoggingEventSink::debug()));

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel("interrupted");
            }
        })
    };

    let result = runner.run_pipeline_with_cancel(&graph, &cancel).await;
    watcher.abort();
    let result = result?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        bail!(result.error.unwrap_or_else(|| "pipeline failed".to_string()));
    }
    Ok(())
}

fn print_template(id: &str) -> Result<()> {
    let Some(template) = templates::by_id(id) else {
        let known: Vec<_> = templates::all().iter().map(|t| t.id.as_str()).collect();
        bail!("unknown template '{id}' (known: {})", known.join(", "));
    };
    println!("{}", template.graph()?.to_json()?);
    Ok(())
}

fn list_templates() {
    for template in templates::all() {
        let nodes = template.parts().0.len();
        println!(
            "{} {:<16} {:<16} {nodes} nodes  {}",
            template.thumbnail,
            template.id.as_str(),
            template.name,
            template.description
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Validate { path } => validate(&path),
        Command::Run { path, direct } => {
            let config = load_config(cli.config.as_deref())?;
            run(&path, direct, &config).await
        }
        Command::Template { id } => print_template(&id),
        Command::Templates => {
            list_templates();
            Ok(())
        }
    }
}

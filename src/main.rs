use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gatehouse_agent::{ExecutionReport, WorkflowKind, WorkflowRequest, WorkflowRunner};
use gatehouse_core::config::AppConfig;
use gatehouse_core::event::{WorkflowEvent, WorkflowEventBus};
use gatehouse_http::ApiRequest;

#[derive(Parser)]
#[command(name = "gatehouse", version, about = "Gated DAG orchestration for concurrent agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "gatehouse.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST gateway
    Serve {
        /// Override the bind address from config
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one canned workflow and print its report as JSON
    Run {
        /// Workflow: sample, complex, api or parallel-api
        workflow: WorkflowKind,
        /// Input placed in the context under `input`
        #[arg(short, long)]
        input: Option<String>,
        /// URL for the API call agent
        #[arg(long)]
        api_url: Option<String>,
        /// HTTP method for the API call agent
        #[arg(long, default_value = "GET")]
        method: String,
        /// Retries after a transport failure
        #[arg(long, default_value = "0")]
        retries: u32,
        /// Per-request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Run the AND and OR demonstrations
    Demo,
    /// Show the effective configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gatehouse=info,warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "gatehouse", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)?;
    if !cli.config.exists() {
        info!(path = %cli.config.display(), "No config file found, using defaults");
    }

    match cli.command {
        Some(Commands::Serve { bind }) => {
            let mut gateway_config = config.gateway.clone();
            if let Some(bind) = bind {
                gateway_config.bind = bind;
            }
            let runner = WorkflowRunner::from_config(&config)?;
            info!(bind = %gateway_config.bind, "Starting workflow gateway");
            let server = gatehouse_gateway::GatewayServer::new(gateway_config, runner);

            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Some(Commands::Run {
            workflow,
            input,
            api_url,
            method,
            retries,
            timeout,
        }) => {
            let mut request = WorkflowRequest {
                input: input.map(serde_json::Value::String),
                api_config: None,
            };
            if let Some(url) = api_url {
                let mut api = ApiRequest::get(url).with_retries(retries).with_timeout(timeout);
                api.method = method;
                request = request.api_config(&api)?;
            }

            let bus = Arc::new(WorkflowEventBus::default());
            let progress = spawn_progress_printer(&bus);
            let runner = WorkflowRunner::from_config(&config)?.with_event_bus(bus.clone());

            let outcome = runner.run(workflow, &request).await;
            drop(runner);
            drop(bus);
            progress.await.ok();

            let report = outcome?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Commands::Demo) => {
            let runner = WorkflowRunner::from_config(&config)?;
            for (kind, label) in [
                (WorkflowKind::Sample, "AND gate"),
                (WorkflowKind::Complex, "OR gate"),
            ] {
                println!("--- {} demo: {} ---", label, kind.description());
                let request =
                    WorkflowRequest::with_input(format!("Input for the {} demonstration", label));
                match runner.run(kind, &request).await {
                    Ok(report) => print_demo_report(&report),
                    Err(e) => warn!(workflow = %kind, error = %e, "Demo workflow failed"),
                }
            }
        }
        Some(Commands::Config) => {
            println!("Config file: {}", cli.config.display());
            println!();
            print!("{}", config.to_toml()?);
        }
        Some(Commands::Completions { .. }) => {} // handled above
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
    }

    Ok(())
}

/// Print workflow events to stderr until the bus is dropped.
fn spawn_progress_printer(bus: &Arc<WorkflowEventBus>) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match rx.recv().await {
                Ok(event) => eprintln!("{}", describe_event(&event)),
                Err(RecvError::Lagged(n)) => eprintln!("[progress] {} events skipped", n),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn describe_event(event: &WorkflowEvent) -> String {
    match event {
        WorkflowEvent::WorkflowStarted { workflow_id, total_nodes } => {
            format!("[{}] started with {} nodes", workflow_id, total_nodes)
        }
        WorkflowEvent::RoundStarted { round, node_ids, .. } => {
            format!("  round {}: {}", round, node_ids.join(", "))
        }
        WorkflowEvent::NodeCompleted { node_id, agent_id, success, .. } => format!(
            "    {} ({}) {}",
            node_id,
            agent_id,
            if *success { "ok" } else { "FAILED" }
        ),
        WorkflowEvent::WorkflowStalled { pending, .. } => {
            format!("  stalled, pending: {}", pending.join(", "))
        }
        WorkflowEvent::WorkflowCompleted { rounds, successful_nodes, failed_nodes, .. } => format!(
            "  done in {} rounds: {} ok, {} failed",
            rounds, successful_nodes, failed_nodes
        ),
    }
}

fn print_demo_report(report: &ExecutionReport) {
    let s = &report.summary;
    println!(
        "workflow {}: {}/{} nodes completed, {} ok, {} failed, {} rounds, {} ms",
        s.workflow_id,
        s.completed_nodes,
        s.total_nodes,
        s.successful_nodes,
        s.failed_nodes,
        report.rounds,
        report.elapsed_ms
    );
    for (agent_id, result) in &report.context.agent_results {
        println!(
            "  {}: {} at {}",
            agent_id,
            if result.success { "success" } else { "failure" },
            result.execution_time.to_rfc3339()
        );
        if let Some(text) = result.field("finalReport").and_then(|v| v.as_str()) {
            println!("\n{}\n", text);
        }
    }
}

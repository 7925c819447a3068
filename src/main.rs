//! RAG kernel - command line entry point.
//!
//! Subcommands:
//! - `serve`: run the IPC server over one shared graph
//! - `check`: load a snapshot file and print the deadlock report as JSON

use clap::{Parser, Subcommand};
use rag_engine::ipc::IpcServer;
use rag_engine::{Config, ResourceAllocationGraph};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Parser)]
#[command(name = "rag-kernel", version, about = "Resource allocation graph engine")]
struct Cli {
    /// JSON config file. Defaults apply when omitted.
    #[arg(long, env = "RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the graph over TCP IPC.
    Serve {
        /// Bind address, overrides config and RAG_LISTEN_ADDR.
        #[arg(long)]
        listen: Option<String>,

        /// Snapshot to preload before accepting connections.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run deadlock detection on a snapshot file.
    Check {
        snapshot: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .apply_env();

    rag_engine::observability::init_tracing(&config.observability);

    match cli.command {
        Command::Serve { listen, snapshot } => {
            let mut graph = ResourceAllocationGraph::with_config(config.engine.clone());
            if let Some(path) = snapshot {
                graph.load_from_file(&path)?;
                tracing::info!("Loaded snapshot {}", path.display());
            }

            let addr: SocketAddr = listen
                .unwrap_or_else(|| config.server.listen_addr.clone())
                .parse()?;
            let server = IpcServer::new(Arc::new(Mutex::new(graph)), addr, config.ipc.clone());

            let cancel = server.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Ctrl-C received");
                    cancel.cancel();
                }
            });

            server.serve().await?;
        }
        Command::Check { snapshot } => {
            let mut graph = ResourceAllocationGraph::with_config(config.engine.clone());
            graph.load_from_file(&snapshot)?;
            let report = graph.detect_deadlock();
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.deadlocked {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gitctx_core::Config;
use gitctx_core::config::McpTransport;
use gitctx_core::bootstrap::{AppBuilder, resolve_config_path};
use gitctx_index::format_results;

#[derive(Debug, Parser)]
#[command(name = "gitctx", version, about = "Retrieval context over GitHub repositories")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the MCP server over the configured transport.
    Serve {
        /// Overrides `mcp.transport`.
        #[arg(long, value_enum)]
        transport: Option<TransportArg>,
        /// Overrides `mcp.port` for the HTTP transport.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch, chunk, annotate, and store a repository.
    Ingest {
        /// GitHub repository URL.
        url: String,
    },
    /// Retrieve context for a question.
    Query {
        text: String,
        /// Number of results per search.
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Show document counts of both collections.
    Stats,
    /// Drop and recreate both collections.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum TransportArg {
    Stdio,
    Http,
}

impl From<TransportArg> for McpTransport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Stdio => Self::Stdio,
            TransportArg::Http => Self::Http,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    init_subscriber(&config_path);

    let builder = AppBuilder::load(&config_path)
        .await
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    tracing::debug!(path = %builder.config_path().display(), "config loaded");

    match cli.command {
        Command::Serve { transport, port } => {
            serve(&builder, transport.map(Into::into), port).await
        }
        Command::Ingest { url } => {
            let service = builder.build_service(true)?;
            let report = service.ingest(&url).await?;
            println!("{}", gitctx_core::format_repository_report(&report));
            Ok(())
        }
        Command::Query { text, k } => {
            let service = builder.build_service(false)?;
            let retrieved = service.query(&text, k).await?;
            println!("{}", format_results(&retrieved.documents));
            Ok(())
        }
        Command::Stats => {
            let service = builder.build_service(false)?;
            let stats = service.stats().await?;
            let names = &builder.config().store;
            println!("{}: {}", names.code_collection, stats.code);
            println!("{}: {}", names.question_collection, stats.questions);
            Ok(())
        }
        Command::Reset => {
            let service = builder.build_service(false)?;
            service.reset().await?;
            println!("collections reset");
            Ok(())
        }
    }
}

async fn serve(
    builder: &AppBuilder,
    transport: Option<McpTransport>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let service = match builder.build_service(true) {
        Ok(service) => service,
        Err(e) => {
            tracing::warn!("repository source unavailable, repo_to_rag disabled: {e:#}");
            builder.build_service(false)?
        }
    };
    service.store().ensure_collections().await?;
    let service = Arc::new(service);

    let mcp = &builder.config().mcp;
    match transport.unwrap_or(mcp.transport) {
        McpTransport::Stdio => gitctx_mcp::serve_stdio(service).await,
        McpTransport::Http => {
            let addr = port.map_or_else(|| mcp.bind_addr(), |port| format!("{}:{port}", mcp.host));
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind MCP HTTP server to {addr}"))?;
            gitctx_mcp::serve_http(service, listener, async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown requested");
            })
            .await
        }
    }
}

/// Logs go to stderr; stdout carries MCP frames and command output.
fn init_subscriber(config_path: &Path) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = Config::load(config_path).map_or_else(|_| "info".to_owned(), |c| c.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

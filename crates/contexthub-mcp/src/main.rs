//! ContextHub MCP adapter — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use contexthub::ContextClient;
use contexthub_mcp::config::AdapterConfig;
use contexthub_mcp::protocol::ProtocolHandler;
use contexthub_mcp::tools::ToolRegistry;
use contexthub_mcp::transport::StdioTransport;
use contexthub_mcp::types::{
    InitializeResult, DEFAULT_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};

#[derive(Parser)]
#[command(
    name = "contexthub-mcp",
    about = "MCP stdio adapter for ContextHub — project context files as tools and resources",
    version
)]
struct Cli {
    /// ContextHub base URL. Also reads CONTEXTHUB_URL.
    #[arg(long)]
    url: Option<String>,

    /// API bearer token. Also reads CONTEXTHUB_TOKEN.
    #[arg(long)]
    token: Option<String>,

    /// Project UUID all calls are scoped to. Also reads CONTEXTHUB_PROJECT.
    #[arg(short, long)]
    project: Option<String>,

    /// Per-call backend timeout in milliseconds. Also reads CONTEXTHUB_TIMEOUT_MS.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server over stdio (default).
    Serve,

    /// Probe backend connectivity with the configured credentials.
    Check,

    /// Print server identity, protocol versions and tools as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   contexthub-mcp completions bash > ~/.local/share/bash-completion/completions/contexthub-mcp
    ///   contexthub-mcp completions zsh > ~/.zfunc/_contexthub-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch an interactive backend inspection shell.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    // Stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.take().unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let client = build_client(&cli)?;
            let handler = ProtocolHandler::new(client);
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        Commands::Check => {
            let config = resolve_config(&cli)?;
            let client = ContextClient::new(config.client_config())?;
            match client.list_context().await {
                Ok(context) => {
                    println!("Backend reachable: {}", config.backend_url);
                    println!("  Project: {}", config.project_id);
                    println!("  Files:   {}", context.files.len());
                }
                Err(e) => {
                    eprintln!("Backend check failed: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Info => {
            let capabilities = InitializeResult::for_version(DEFAULT_PROTOCOL_VERSION);
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "protocol_versions": SUPPORTED_PROTOCOL_VERSIONS,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "contexthub-mcp", &mut std::io::stdout());
        }

        Commands::Repl => {
            let client = build_client(&cli)?;
            let handle = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || contexthub_mcp::repl::run(client, handle))
                .await??;
        }
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<AdapterConfig> {
    AdapterConfig::resolve(
        cli.url.clone(),
        cli.token.clone(),
        cli.project.clone(),
        cli.timeout_ms,
    )
}

fn build_client(cli: &Cli) -> anyhow::Result<Arc<ContextClient>> {
    let config = resolve_config(cli)?;
    Ok(Arc::new(ContextClient::new(config.client_config())?))
}

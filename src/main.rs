use clap::{Parser, ValueEnum};
use letmecount_mcp::errors::ToolError;
use letmecount_mcp::services::config::AppConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Parser)]
#[command(name = "letmecount-mcp")]
#[command(about = "MCP server for the Let-me-count expense sharing API", long_about = None)]
struct Args {
    /// Transport to serve MCP on
    #[arg(short, long, value_enum, default_value = "stdio")]
    transport: Transport,

    /// Listening port for the http transport (overrides LETMECOUNT_MCP_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend base URL (overrides LETMECOUNT_API_URL)
    #[arg(long)]
    api_url: Option<String>,
}

async fn run(args: Args) -> Result<(), ToolError> {
    let mut config = AppConfig::from_env()?;
    if let Some(raw) = args.api_url.as_deref() {
        config = config.with_api_url(raw)?;
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    match args.transport {
        Transport::Stdio => letmecount_mcp::mcp::server::run_stdio(config).await,
        Transport::Http => letmecount_mcp::mcp::http::run_http(config).await,
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("letmecount-mcp: {}", err);
        std::process::exit(1);
    }
}

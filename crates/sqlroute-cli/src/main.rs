//! # sqlroute CLI Entry Point
//!
//! Main binary for the sqlroute read/write splitting proxy.
//!
//! ## Usage
//!
//! ```bash
//! # Start the proxy (credentials from DB_USER / DB_PASSWORD / DB_NAME)
//! sqlroute serve -c topology.json
//!
//! # Override the listen port from the config file
//! sqlroute serve -c topology.json -b 127.0.0.1 -p 9000
//!
//! # Send a query (outputs raw JSON)
//! sqlroute query http://127.0.0.1:8080 "SELECT COUNT(*) FROM film" -s custom
//!
//! # Show the configured topology
//! sqlroute health http://127.0.0.1:8080
//! ```
//!
//! ## URL Format
//!
//! All URLs must include the `http://` or `https://` prefix.

use anyhow::Result;
use argh::FromArgs;
use sqlroute_common::{DbCredentials, Strategy, TopologyConfig};
use std::net::SocketAddr;
use std::sync::Arc;

/// Validates that a URL string starts with http:// or https://
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

#[derive(FromArgs)]
/// sqlroute - read/write splitting SQL proxy
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Query(QueryArgs),
    Health(HealthArgs),
}

/// Arguments for starting the proxy.
///
/// The topology file is read once at startup:
///
/// ```json
/// {"manager": {"host": "10.0.0.10", "port": 3306},
///  "workers": [{"host": "10.0.0.11", "port": 3306}],
///  "listen_port": 8080}
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// start the sqlroute proxy
struct ServeArgs {
    /// path to the JSON topology file
    #[argh(option, short = 'c')]
    config: String,

    /// host to bind the HTTP server to
    ///
    /// Defaults to "0.0.0.0".
    #[argh(option, short = 'b', default = "\"0.0.0.0\".into()")]
    bind: String,

    /// port to listen on, overriding `listen_port` from the config file
    #[argh(option, short = 'p')]
    port: Option<u16>,
}

/// Arguments for sending a single query.
///
/// The response is written to stdout as raw JSON; errors go to stderr with
/// a non-zero exit code.
#[derive(FromArgs)]
#[argh(subcommand, name = "query")]
/// send a SQL query through a running proxy
struct QueryArgs {
    /// address of the proxy (e.g. http://127.0.0.1:8080)
    #[argh(positional)]
    server_address: String,

    /// SQL text to execute
    #[argh(positional)]
    sql: String,

    /// routing strategy: direct, random or custom
    #[argh(option, short = 's', default = "\"direct\".into()")]
    strategy: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "health")]
/// show the topology a running proxy serves
struct HealthArgs {
    /// address of the proxy (e.g. http://127.0.0.1:8080)
    #[argh(positional)]
    server_address: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // query/health print JSON to stdout and stay quiet otherwise
    if matches!(cli.command, Commands::Serve(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Query(args) => run_query(args).await,
        Commands::Health(args) => run_health(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = TopologyConfig::from_file(&args.config)?;
    let credentials = DbCredentials::from_env();

    tracing::info!("Loaded topology from {}", args.config);
    tracing::info!("Manager: {}:{}", config.manager.host, config.manager.port);
    for worker in &config.workers {
        tracing::info!("Worker: {}:{}", worker.host, worker.port);
    }
    if config.workers.is_empty() {
        tracing::warn!("No workers configured; random and custom reads will be rejected");
    }
    tracing::info!("Database: {} as {}", credentials.database, credentials.user);

    let port = args.port.unwrap_or(config.listen_port);
    let addr: SocketAddr = format!("{}:{}", args.bind, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", args.bind, port, e))?;

    let handler = sqlroute_proxy::QueryHandler::mysql(&config, credentials);
    let server = sqlroute_proxy::HttpServer::new(Arc::new(handler));
    server.run(addr).await?;

    Ok(())
}

async fn run_query(args: QueryArgs) -> Result<()> {
    validate_http_url(&args.server_address, "server address")?;
    let strategy: Strategy = args.strategy.parse()?;

    let client = sqlroute_client::SqlrouteClient::new(&args.server_address);
    let response = client.query(args.sql, strategy).await?;

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

async fn run_health(args: HealthArgs) -> Result<()> {
    validate_http_url(&args.server_address, "server address")?;

    let client = sqlroute_client::SqlrouteClient::new(&args.server_address);
    let health = client.health().await?;

    println!("{}", serde_json::to_string(&health)?);
    Ok(())
}

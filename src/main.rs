//! `pagesdns` server.
//!
//! ```bash
//! # In-memory config, credentials from request headers
//! pagesdns --listen 127.0.0.1:8788
//!
//! # Persist config to a file and fall back to stored tokens
//! PASSWORD=secret pagesdns --config-file config.json --credential-source stored
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagesdns::cloudflare::{Client, Pagination, CLOUDFLARE_API_URL};
use pagesdns::config::{
    ConfigStore, CredentialSource, FileConfigStore, HandlerConfig, MemoryConfigStore,
};
use pagesdns::server::{router, AppState};
use pagesdns::{HttpClientConfig, Orchestrator};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CredentialSourceArg {
    Headers,
    Stored,
}

impl From<CredentialSourceArg> for CredentialSource {
    fn from(arg: CredentialSourceArg) -> Self {
        match arg {
            CredentialSourceArg::Headers => CredentialSource::Headers,
            CredentialSourceArg::Stored => CredentialSource::Stored,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "pagesdns")]
#[command(about = "Cloudflare Pages custom-domain manager with automatic CNAME records", long_about = None)]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "PAGESDNS_LISTEN", default_value = "0.0.0.0:8788")]
    listen: SocketAddr,

    /// Password accepted by /api/auth
    #[arg(long, env = "PASSWORD", default_value = "admin", hide_env_values = true)]
    password: String,

    /// JSON file holding the stored config (in memory when omitted)
    #[arg(long, env = "PAGESDNS_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_URL", default_value = CLOUDFLARE_API_URL)]
    api_base_url: String,

    /// Where Cloudflare tokens come from
    #[arg(long, value_enum, default_value = "headers")]
    credential_source: CredentialSourceArg,

    /// Fetch a single page of projects of this size instead of every page
    #[arg(long, value_name = "PER_PAGE")]
    single_page: Option<u32>,

    /// Prefer the request's zone token over per-zone tokens from the config
    #[arg(long)]
    no_zone_token_override: bool,

    /// Upstream request timeout in seconds (none by default)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut http_config = HttpClientConfig::new();
    if let Some(secs) = args.timeout_secs {
        http_config = http_config.timeout(Duration::from_secs(secs));
    }
    let client = Client::with_base_url(&args.api_base_url, http_config)
        .map_err(|err| anyhow::anyhow!("building HTTP client: {err}"))?;

    let store: Arc<dyn ConfigStore> = match &args.config_file {
        Some(path) => {
            info!(path = %path.display(), "using file config store");
            Arc::new(FileConfigStore::new(path))
        }
        None => {
            info!("using in-memory config store");
            Arc::new(MemoryConfigStore::new())
        }
    };

    let pagination = match args.single_page {
        Some(per_page) => Pagination::SinglePage { per_page },
        None => Pagination::AllPages,
    };
    let handler_config = HandlerConfig::new()
        .credential_source(args.credential_source.into())
        .pagination(pagination)
        .zone_token_override(!args.no_zone_token_override);

    let orchestrator = Orchestrator::new(client, handler_config, store);
    let app = router(AppState::new(orchestrator, args.password));

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!(addr = %args.listen, "pagesdns listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use linguadashd::db;
use linguadashd::http::router::build_router;
use linguadashd::http::types::AppState;
use linguadashd::identity::HttpIdentityProvider;

#[derive(Parser, Debug)]
#[command(name = "linguadashd")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8660")]
    addr: String,
    #[arg(long, default_value = "linguadash.sqlite3")]
    db_path: PathBuf,
    #[arg(long, default_value = "")]
    identity_base_url: String,
    #[arg(long, default_value = "")]
    identity_api_key: String,
    #[arg(long, default_value = "")]
    webhook_secret: String,
}

struct Config {
    addr: String,
    db_path: PathBuf,
    identity_base_url: String,
    identity_api_key: String,
    webhook_secret: String,
}

fn load_config() -> Config {
    let args = Args::parse();
    Config {
        addr: args.addr,
        db_path: args.db_path,
        identity_base_url: non_empty(args.identity_base_url, "LINGUADASH_IDENTITY_URL")
            .unwrap_or_else(|| "https://identity.example.com".to_string()),
        identity_api_key: non_empty(args.identity_api_key, "LINGUADASH_IDENTITY_API_KEY")
            .unwrap_or_default(),
        webhook_secret: non_empty(args.webhook_secret, "LINGUADASH_WEBHOOK_SECRET")
            .unwrap_or_default(),
    }
}

fn non_empty(flag: String, env_key: &str) -> Option<String> {
    if !flag.trim().is_empty() {
        return Some(flag);
    }
    match std::env::var(env_key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let config = load_config();

    let addr: SocketAddr = config.addr.parse().map_err(|e| {
        error!(event = "invalid_addr", addr = %config.addr, error = %e);
        anyhow::anyhow!("invalid --addr {}: {}", config.addr, e)
    })?;

    let conn = db::open_db(&config.db_path)?;
    let state = Arc::new(AppState {
        db: Mutex::new(conn),
        db_path: config.db_path.clone(),
        identity: Arc::new(HttpIdentityProvider::new(
            config.identity_base_url.clone(),
            config.identity_api_key.clone(),
        )),
        webhook_secret: config.webhook_secret.clone(),
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        event = "server_start",
        addr = %config.addr,
        db_path = %config.db_path.to_string_lossy()
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!(event = "server_shutdown");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

use musaed_api::{start_server_with_auth, ApiAuth, ApiRole, ServerOptions};
use musaed_core::EngineConfig;
use musaed_storage::Storage;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "musaed-server", about = "Musaed assistant server")]
struct Cli {
    /// HTTP listening address
    #[arg(long, env = "MUSAED_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Directory holding the question log and conversation history
    #[arg(long, env = "MUSAED_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Engine configuration (JSON)
    #[arg(long, env = "MUSAED_CONFIG")]
    config: Option<PathBuf>,

    /// Admin API keys; when set, every admin route requires one
    #[arg(long = "admin-key", env = "MUSAED_ADMIN_KEYS", value_delimiter = ',')]
    admin_keys: Vec<String>,

    /// Where manual backups are written
    #[arg(long, env = "MUSAED_BACKUP_DIR", default_value = "./backups")]
    backup_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_observability();

    let cli = Cli::parse();
    info!("Starting Musaed server");
    info!("Data directory: {:?}", cli.data_dir);

    let engine = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let storage = Storage::open(&cli.data_dir)?;

    let auth = if cli.admin_keys.is_empty() {
        ApiAuth::new()
    } else {
        let auth = ApiAuth::new().require_keys();
        for key in &cli.admin_keys {
            auth.insert(key.trim(), ApiRole::Admin)?;
        }
        auth
    };

    let options = ServerOptions {
        engine,
        backup_dir: cli.backup_dir,
    };

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    let listener = tokio::net::TcpListener::bind(cli.addr).await?;
    info!("Listening on http://{}", cli.addr);
    start_server_with_auth(listener, storage, auth, options, shutdown)
        .await?
        .await??;

    info!("Server stopped successfully");
    Ok(())
}

fn init_observability() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .json();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,musaed_api=debug,musaed_storage=debug".into());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}

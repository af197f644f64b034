use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ticketing_backend_lib::{config::Settings, create_router, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// How often expired login lockouts are swept
const LOCKOUT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "ticketing-server", about = "Ticketing authentication server")]
struct Args {
    /// Path to the TOML config file; missing files fall back to defaults
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the bind address from the config
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    if args.log_json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    let addr = settings.bind_addr;
    let state = AppState::from_settings(settings).await?;
    state.rate_limiter.spawn_cleanup(LOCKOUT_SWEEP_INTERVAL);

    let app = create_router(Arc::new(state));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    // Connect info feeds the per-client login lockout
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

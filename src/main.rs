mod config;
mod error;
mod fetcher;
mod indicator;
mod logging;
mod model;
mod pipeline;
mod provider;
mod server;
mod stats;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use fetcher::AggregateFetcher;
use logging::{ErrorLog, FileErrorLog, init_tracing};
use provider::MarketData;
use provider::polygon::PolygonClient;
use server::{AppState, Playground, build_router};

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("error log unavailable")]
    ErrorLog,
    #[display("market data provider error")]
    Provider,
    #[display("server error")]
    Server,
}

#[derive(Parser)]
#[command(name = "trade-insights", about = "Stock aggregates and SMA over HTTP")]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    // A missing .env is fine; the key may come from the real environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config =
        config::load_or_default(cli.config.as_deref()).change_context(AppError::Config)?;

    init_tracing(&config.general);

    let api_key = config::api_key_from_env().change_context(AppError::Config)?;

    // ── Collaborators ─────────────────────────────────────────────────────────
    let errors: Arc<dyn ErrorLog> = Arc::new(
        FileErrorLog::open(Path::new(&config.general.error_log))
            .change_context(AppError::ErrorLog)?,
    );

    let provider: Arc<dyn MarketData> = Arc::new(
        PolygonClient::new(api_key, &config.provider).change_context(AppError::Provider)?,
    );

    let playground =
        Playground::from_config(&config.playground).change_context(AppError::Config)?;

    let state = AppState {
        fetcher: AggregateFetcher::new(provider, config.provider.result_limit),
        errors,
        playground,
    };

    // ── HTTP server ───────────────────────────────────────────────────────────
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .change_context(AppError::Config)
        .attach_with(|| format!("bind: {}", config.server.bind))?;

    let listener = TcpListener::bind(addr)
        .await
        .change_context(AppError::Server)
        .attach_with(|| format!("bind: {addr}"))?;

    info!(%addr, "listening");

    let cancel = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(cancel.clone()));

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .change_context(AppError::Server)?;

    info!("shutdown complete");
    Ok(())
}

async fn watch_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("ctrl+c received, shutting down");
            cancel.cancel();
        }
        Err(e) => tracing::warn!(error = %e, "failed to listen for ctrl+c"),
    }
}

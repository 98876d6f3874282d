use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use expl::config::Config;
use expl::router::{AppState, expl_router};
use expl::security::SystemClock;
use expl::{ExplDb, ExplError, TokenCodec};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const LISTEN_ADDR: &str = "0.0.0.0:8000";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cfg = Config::load();

    let loglevel = cfg
        .as_ref()
        .map(|c| c.settings.loglevel.clone())
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(loglevel));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let result = match cfg {
        Ok(cfg) => run(cfg).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: Config) -> Result<(), ExplError> {
    info!(
        use_proxy_headers = cfg.use_proxy_headers,
        public_url = %cfg.settings.public_url,
        handler_timeout_secs = cfg.settings.handler_timeout_secs,
        loglevel = %cfg.settings.loglevel
    );

    // One key per process; restarting invalidates every link issued so far.
    let codec = Arc::new(TokenCodec::generate()?);

    let db = ExplDb::init(&cfg.connect_string).await?;
    info!("Database successfully initialized");

    let state = AppState::new(db.clone(), codec, Arc::new(SystemClock), cfg.settings.clone())?;
    let app = expl_router(state, &cfg);

    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!("Listening for HTTP connections on {}", LISTEN_ADDR);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down");
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

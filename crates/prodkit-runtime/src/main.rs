//! prodkit runtime binary.
//!
//! - Loads `prodkit.yaml` (or the path given as first argument)
//! - Counts allocations through `CountingAlloc`
//! - Starts the runtime-metrics reporter against statsd or the in-process sink
//! - Serves `/healthz/*` and marks the service ready once listening
//! - Graceful shutdown on Ctrl+C / SIGTERM

use tracing_subscriber::{fmt, EnvFilter};

use prodkit_core::error::{ProdkitError, Result};
use prodkit_core::BuildMetadata;
use prodkit_runtime::alloc::CountingAlloc;
use prodkit_runtime::{app_state::AppState, config, router, Reporter};

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc::system();

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code().as_str(), "prodkit-runtime failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.healthz.listen_addr()?;

    let build = BuildMetadata {
        commit_sha: option_env!("COMMIT_SHA").map(str::to_string),
        build_date: option_env!("BUILD_DATE").map(str::to_string),
        version: option_env!("VERSION")
            .or(Some(env!("CARGO_PKG_VERSION")))
            .map(str::to_string),
    };
    let reporter_cfg = cfg.reporter.to_reporter_config(build);

    let state = AppState::new(cfg).await?;
    let reporter = Reporter::start(state.sink(), reporter_cfg).await?;
    let healthz = state.healthz(reporter.handle());
    let app = router::build_router(&state, healthz.clone());

    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(%listen, "prodkit-runtime listening");
    healthz.ready();

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    healthz.not_ready();
    reporter.shutdown().await?;
    served.map_err(|e| ProdkitError::Io(format!("server failed: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}

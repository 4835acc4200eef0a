//! Operational HTTP endpoints.
//!
//! - `/healthz/`                : index page (also any unknown `/healthz/...`)
//! - `/healthz/alive`           : liveness (503 until marked alive)
//! - `/healthz/ready`           : readiness (503 until marked ready)
//! - `/healthz/stats`           : JSON snapshot from the reporter
//! - `/healthz/diediedie`       : exits the process
//! - `/healthz/abortabortabort` : flips alive/ready to unhealthy
//! - `/healthz/pprof/...`       : diagnostics index and command line
//! - `/metrics`                 : text dump of the in-process sink

mod state;

pub use state::{ExitHook, Healthz, HealthzOptions, DIE_EXIT_CODE};

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::time::Instant;

use prodkit_core::{tags, RuntimeStats, ServiceInfo, ToolchainInfo};

use crate::sink::MemorySink;

pub const ROOT_PREFIX: &str = "/healthz";

const INDEX_HTML: &str = r#"
<html>
	<head><title>healthz</title></head>

	<body>
		<h1>Healthz Endpoints</h1>
		<ul>
			<li><a href="{prefix}/ready">{prefix}/ready</a></li>
			<li><a href="{prefix}/alive">{prefix}/alive</a></li>
			<li><a href="{prefix}/stats">{prefix}/stats</a></li>
			<li><a href="{prefix}/diediedie">{prefix}/diediedie</a> (Kills the app)</li>
			<li><a href="{prefix}/abortabortabort">{prefix}/abortabortabort</a> (Kills the pod!)</li>
			<li><a href="{prefix}/pprof/">{prefix}/pprof/</a></li>
		</ul>
	</body>
</html>"#;

const PPROF_HTML: &str = r#"
<html>
	<head><title>{prefix}/pprof/</title></head>

	<body>
		<h1>Diagnostics</h1>
		<ul>
			<li><a href="{prefix}/pprof/cmdline">cmdline</a>: the command line of this process</li>
			<li>profile, symbol, trace: not available in this build</li>
		</ul>
	</body>
</html>"#;

/// `/healthz` routes bound to `healthz`.
pub fn router(healthz: Healthz) -> Router {
    Router::new()
        .route("/healthz", get(|| async { Redirect::permanent("/healthz/") }))
        .route("/healthz/", get(index))
        .route("/healthz/ready", get(ready))
        .route("/healthz/alive", get(alive))
        .route("/healthz/stats", get(stats))
        .route("/healthz/diediedie", get(die_die_die))
        .route("/healthz/abortabortabort", get(abort_abort_abort))
        .route("/healthz/pprof", get(|| async { Redirect::permanent("/healthz/pprof/") }))
        .route("/healthz/pprof/", get(pprof_index))
        .route("/healthz/pprof/cmdline", get(pprof_cmdline))
        .route("/healthz/pprof/profile", get(pprof_unavailable))
        .route("/healthz/pprof/symbol", get(pprof_unavailable))
        .route("/healthz/pprof/trace", get(pprof_unavailable))
        .fallback(subtree)
        .with_state(healthz)
}

/// Anything else under `/healthz/` gets the index.
async fn subtree(uri: Uri) -> Response {
    if uri.path().starts_with("/healthz/") {
        index().await.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

#[derive(Debug, Serialize)]
struct StatusInfo {
    http_code: u16,
    description: &'static str,
}

fn status_info(healthy: bool) -> StatusInfo {
    let (code, description) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };
    StatusInfo {
        http_code: code.as_u16(),
        description,
    }
}

fn status_response(healthy: bool) -> Response {
    if healthy {
        (StatusCode::OK, "healthy").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy").into_response()
    }
}

async fn index() -> Html<String> {
    Html(INDEX_HTML.replace("{prefix}", ROOT_PREFIX))
}

async fn ready(State(h): State<Healthz>) -> Response {
    let start = Instant::now();
    let ready = h.is_ready();
    let resp = status_response(ready);
    h.record_timing("healthz.ready", start.elapsed(), tags::tag("ready", ready))
        .await;
    resp
}

async fn alive(State(h): State<Healthz>) -> Response {
    let start = Instant::now();
    let alive = h.is_alive();
    let resp = status_response(alive);
    h.record_timing("healthz.alive", start.elapsed(), tags::tag("alive", alive))
        .await;
    resp
}

#[derive(Debug, Serialize)]
struct StatsBody {
    status: StatusInfo,
    service_info: ServiceInfo,
    #[serde(rename = "go_info")]
    toolchain_info: ToolchainInfo,
    runtime: RuntimeStats,
}

async fn stats(State(h): State<Healthz>) -> Response {
    let start = Instant::now();
    let snapshot = h.stats().map(|s| s.get()).unwrap_or_default();

    let body = StatsBody {
        status: status_info(h.is_healthy()),
        service_info: snapshot.service,
        toolchain_info: snapshot.toolchain,
        runtime: snapshot.runtime,
    };

    let (resp, failed) = match serde_json::to_string_pretty(&body) {
        Ok(json) => (
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], json).into_response(),
            false,
        ),
        Err(e) => (
            (StatusCode::INTERNAL_SERVER_ERROR, format!("error getting stats: {e}")).into_response(),
            true,
        ),
    };

    h.record_timing("healthz.stats", start.elapsed(), tags::tag("error", failed))
        .await;
    resp
}

async fn die_die_die(State(h): State<Healthz>) -> StatusCode {
    tracing::warn!("exit requested via {}/diediedie", ROOT_PREFIX);
    h.die();
    StatusCode::OK
}

async fn abort_abort_abort(State(h): State<Healthz>) -> impl IntoResponse {
    tracing::warn!("marking service unhealthy via {}/abortabortabort", ROOT_PREFIX);
    h.not_ready();
    h.not_alive();
    (StatusCode::OK, "App reporting as unhealthy...")
}

async fn pprof_index() -> Html<String> {
    Html(PPROF_HTML.replace("{prefix}", ROOT_PREFIX))
}

async fn pprof_cmdline() -> impl IntoResponse {
    let cmdline = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("\0");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        cmdline,
    )
}

async fn pprof_unavailable() -> impl IntoResponse {
    (StatusCode::NOT_IMPLEMENTED, "profiling is not available in this build")
}

/// Text dump of an in-process sink.
pub async fn metrics(State(sink): State<Arc<MemorySink>>) -> Response {
    let body = sink.render();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

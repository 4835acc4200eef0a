//! `/healthz` HTTP surface driven through the router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use prodkit_core::{MemStats, RuntimeStats};
use prodkit_runtime::ops::{self, Healthz, HealthzOptions};
use prodkit_runtime::reporter::Sampler;
use prodkit_runtime::sink::{EmissionKind, MemorySink};
use prodkit_runtime::{Reporter, ReporterConfig};

async fn get(app: &Router, path: &str) -> (StatusCode, String) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn alive_and_ready_follow_state() {
    let h = Healthz::new(HealthzOptions::default());
    let app = ops::router(h.clone());

    assert_eq!(get(&app, "/healthz/alive").await, (StatusCode::SERVICE_UNAVAILABLE, "unhealthy".into()));
    assert_eq!(get(&app, "/healthz/ready").await, (StatusCode::SERVICE_UNAVAILABLE, "unhealthy".into()));

    h.alive();
    h.ready();
    assert_eq!(get(&app, "/healthz/alive").await, (StatusCode::OK, "healthy".into()));
    assert_eq!(get(&app, "/healthz/ready").await, (StatusCode::OK, "healthy".into()));
}

#[tokio::test]
async fn abort_marks_unhealthy() {
    let h = Healthz::new(HealthzOptions {
        alive_on_start: true,
        ..Default::default()
    });
    h.ready();
    let app = ops::router(h.clone());

    let (status, body) = get(&app, "/healthz/abortabortabort").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "App reporting as unhealthy...");
    assert!(!h.is_alive());
    assert!(!h.is_ready());
    assert_eq!(get(&app, "/healthz/alive").await.0, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn diediedie_runs_exit_hook() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let h = Healthz::new(HealthzOptions {
        on_die: Some(Arc::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })),
        ..Default::default()
    });
    let app = ops::router(h);

    get(&app, "/healthz/diediedie").await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handler_timings_go_to_sink() {
    let sink = Arc::new(MemorySink::recording());
    let h = Healthz::new(HealthzOptions {
        sink: Some(sink.clone()),
        sample_rate: 0.25,
        alive_on_start: true,
        ..Default::default()
    });
    let app = ops::router(h);

    get(&app, "/healthz/ready").await;
    get(&app, "/healthz/alive").await;
    get(&app, "/healthz/stats").await;

    let ready = sink.named("healthz.ready");
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].kind, EmissionKind::Timing);
    assert_eq!(ready[0].tags, vec!["ready:false"]);
    assert_eq!(ready[0].rate, 0.25);
    assert_eq!(sink.named("healthz.alive")[0].tags, vec!["alive:true"]);
    assert_eq!(sink.named("healthz.stats")[0].tags, vec!["error:false"]);
}

#[tokio::test]
async fn stats_without_reporter_uses_empty_snapshot() {
    let app = ops::router(Healthz::new(HealthzOptions::default()));
    let (status, body) = get(&app, "/healthz/stats").await;
    assert_eq!(status, StatusCode::OK);

    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["status"]["description"], "unhealthy");
    assert_eq!(v["status"]["http_code"], 503);
    assert_eq!(v["runtime"]["num_cpu"], 0);
    assert_eq!(v["service_info"]["version"], "");
}

struct FixedSampler;

impl Sampler for FixedSampler {
    fn sample(&mut self) -> (RuntimeStats, MemStats) {
        let runtime = RuntimeStats {
            num_cpu: 16,
            num_foreign_calls: 2,
            num_tasks: 9,
            max_procs: 8,
        };
        (runtime, MemStats::default())
    }
}

#[tokio::test(start_paused = true)]
async fn stats_reads_reporter_snapshot() {
    let sink = Arc::new(MemorySink::new());
    let reporter = Reporter::start_with_sampler(sink, ReporterConfig::default(), FixedSampler)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let h = Healthz::new(HealthzOptions {
        stats: Some(reporter.handle()),
        alive_on_start: true,
        ..Default::default()
    });
    h.ready();
    let app = ops::router(h);

    let (status, body) = get(&app, "/healthz/stats").await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["status"]["description"], "healthy");
    assert_eq!(v["runtime"]["num_cpu"], 16);
    assert_eq!(v["runtime"]["num_tasks"], 9);
    assert_eq!(v["go_info"]["os"], std::env::consts::OS);
    assert!(v.get("toolchain_info").is_none());

    reporter.shutdown().await.unwrap();
}

#[tokio::test]
async fn index_and_pprof_pages() {
    let app = ops::router(Healthz::new(HealthzOptions::default()));

    let (status, body) = get(&app, "/healthz/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<a href="/healthz/ready">/healthz/ready</a>"#));
    assert!(!body.contains("{prefix}"));

    let (status, body) = get(&app, "/healthz/pprof/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/healthz/pprof/cmdline"));

    let (status, body) = get(&app, "/healthz/pprof/cmdline").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.is_empty());

    assert_eq!(get(&app, "/healthz/pprof/profile").await.0, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn bare_prefixes_redirect_and_unknown_paths_get_index() {
    let app = ops::router(Healthz::new(HealthzOptions::default()));

    for (from, to) in [("/healthz", "/healthz/"), ("/healthz/pprof", "/healthz/pprof/")] {
        let resp = app
            .clone()
            .oneshot(Request::builder().uri(from).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PERMANENT_REDIRECT, "from={from}");
        assert_eq!(resp.headers()[axum::http::header::LOCATION], to);
    }

    let (status, body) = get(&app, "/healthz/nope").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Healthz Endpoints"));

    let (status, body) = get(&app, "/healthz/a/b/c").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Healthz Endpoints"));

    assert_eq!(get(&app, "/elsewhere").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_route_renders_memory_sink() {
    let sink = Arc::new(MemorySink::new());
    prodkit_core::MetricsSink::gauge(sink.as_ref(), "go.num_cpu", 4.0, &[], 1.0)
        .await
        .unwrap();

    let app = Router::new()
        .route("/metrics", axum::routing::get(ops::metrics))
        .with_state(sink);
    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("go_num_cpu{} 4"));
}

#[tokio::test]
async fn app_router_serves_metrics_without_statsd() {
    use prodkit_runtime::{app_state::AppState, config, router};

    let cfg = config::load_from_str("version: 1\nhealthz:\n  listen: \"127.0.0.1:0\"\n").unwrap();
    let state = AppState::new(cfg).await.unwrap();
    assert!(state.memory_sink().is_some());

    let healthz = state.healthz(prodkit_runtime::StatsHandle::default());
    let app = router::build_router(&state, healthz);

    assert_eq!(get(&app, "/healthz/alive").await.0, StatusCode::OK);
    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthz_alive_nanos_count{alive=\"true\"} 1"));
}

#[tokio::test]
async fn app_router_has_no_metrics_route_with_statsd() {
    use prodkit_runtime::{app_state::AppState, config, router};

    let cfg = config::load_from_str("version: 1\nstatsd:\n  addr: \"127.0.0.1:8125\"\n").unwrap();
    let state = AppState::new(cfg).await.unwrap();
    assert!(state.memory_sink().is_none());

    let app = router::build_router(&state, state.healthz(prodkit_runtime::StatsHandle::default()));
    assert_eq!(get(&app, "/metrics").await.0, StatusCode::NOT_FOUND);
}

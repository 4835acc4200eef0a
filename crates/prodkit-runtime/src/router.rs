//! Axum router wiring.
//!
//! `/healthz/*` always; `/metrics` only when metrics are kept in process.

use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::ops::{self, Healthz};

pub fn build_router(state: &AppState, healthz: Healthz) -> Router {
    let app = ops::router(healthz);

    match state.memory_sink() {
        Some(sink) => app.merge(Router::new().route("/metrics", get(ops::metrics)).with_state(sink)),
        None => app,
    }
}

//! Health check endpoint for load balancers and monitoring.
//!
//! All state is in-process, so there are no backing services to probe;
//! a 200 means the server is up and serving requests.

use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

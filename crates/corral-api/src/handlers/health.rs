//! Health check handlers
//!
//! - /health - status of the tuple store and identity repository
//! - /health/live - the process is running
//! - /health/ready - the tuple store answers, so traffic can be served

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use corral_core::CorralError;

use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const READY_TIMEOUT: Duration = Duration::from_secs(2);

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
}

/// Simple health response for liveness/readiness probes
#[derive(Serialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    START_TIME.get_or_init(Instant::now).elapsed().as_secs()
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store = check_component("openfga", state.store.health_check()).await;
    let identities = check_component("identities", async {
        state.identities.count_identities().await.map(|_| ())
    })
    .await;

    // The store decides every request, so losing it makes the service unhealthy.
    let status = match (store.status, identities.status) {
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        (HealthStatus::Healthy, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: get_uptime_seconds(),
        components: vec![store, identities],
    };

    let status_code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status_code, Json(response))
}

async fn check_component<F>(name: &str, check: F) -> ComponentHealth
where
    F: Future<Output = Result<(), CorralError>>,
{
    let start = Instant::now();

    let (status, message) = match tokio::time::timeout(CHECK_TIMEOUT, check).await {
        Ok(Ok(())) => {
            debug!(component = name, "Health check passed");
            (HealthStatus::Healthy, None)
        }
        Ok(Err(e)) => {
            warn!(component = name, error = %e, "Health check failed");
            (HealthStatus::Unhealthy, Some(e.to_string()))
        }
        Err(_) => {
            warn!(component = name, "Health check timed out");
            (
                HealthStatus::Unhealthy,
                Some(format!(
                    "Health check timed out after {} seconds",
                    CHECK_TIMEOUT.as_secs()
                )),
            )
        }
    };

    ComponentHealth {
        name: name.to_string(),
        status,
        message,
        latency_ms: start.elapsed().as_millis() as u64,
    }
}

/// Kubernetes liveness probe
pub async fn liveness() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: "alive".to_string(),
        }),
    )
}

/// Kubernetes readiness probe
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<SimpleHealthResponse>) {
    let ready = matches!(
        tokio::time::timeout(READY_TIMEOUT, state.store.health_check()).await,
        Ok(Ok(()))
    );

    if ready {
        (
            StatusCode::OK,
            Json(SimpleHealthResponse {
                status: "ready".to_string(),
            }),
        )
    } else {
        warn!("Readiness check failed: tuple store unavailable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: "not_ready".to_string(),
            }),
        )
    }
}

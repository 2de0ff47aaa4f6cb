//! Liveness and readiness probes

use std::fmt::Display;
use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, Json};
use rolechat_db::PgPool;
use rolechat_service::dto::{DependencyCheck, HealthChecks, HealthResponse, ReadinessResponse};

use crate::state::AppState;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// GET /health/ready
///
/// Probes Postgres and Redis concurrently; 503 unless both answer.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let checks = match state.infra() {
        Some(infra) => {
            let (database, redis) = tokio::join!(probe_database(&infra.pool), async {
                check("redis", infra.redis.health_check().await)
            });
            HealthChecks { database, redis }
        }
        None => HealthChecks {
            database: DependencyCheck::down(),
            redis: DependencyCheck::down(),
        },
    };

    let response = ReadinessResponse::from_checks(checks);
    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

async fn probe_database(pool: &PgPool) -> DependencyCheck {
    let started = Instant::now();
    check("postgres", pool.acquire().await.map(|_| started.elapsed()))
}

fn check<E: Display>(dependency: &str, probe: Result<Duration, E>) -> DependencyCheck {
    match probe {
        Ok(latency) => DependencyCheck::up(latency),
        Err(e) => {
            tracing::warn!(dependency, error = %e, "Readiness probe failed");
            DependencyCheck::down()
        }
    }
}

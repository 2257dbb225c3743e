// src/handlers/health.rs

use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    config::AppState,
    models::health::{HealthServer, HealthStatus},
};

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Estado do serviço (sempre 200; veja `status` e `database`)", body = HealthStatus)
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> Json<HealthStatus> {
    let database_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&app_state.db_pool)
        .await
        .map_err(|e| tracing::warn!(error = %e, "Health check sem acesso ao banco"))
        .is_ok();

    Json(HealthStatus {
        status: if database_ok { "ok" } else { "degraded" },
        timestamp: Utc::now(),
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime: app_state.started_at.elapsed().as_secs(),
        database: if database_ok { "connected" } else { "disconnected" },
        server: HealthServer {
            address: app_state.config.server_addr.clone(),
            environment: app_state.config.environment.clone(),
        },
    })
}

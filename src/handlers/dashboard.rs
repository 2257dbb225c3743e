// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::validate_payload,
    },
    config::AppState,
    handlers::finance::PeriodQuery,
    middleware::i18n::Locale,
    models::dashboard::DashboardStats,
};

// GET /api/v1/stats
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Dashboard",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Indicadores do rebanho, resultado do período e caixa do mês", body = DashboardStats),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(period), _): WithRejection<Query<PeriodQuery>, AppError>,
) -> Result<Json<DashboardStats>, ApiError> {
    validate_payload(&period, &locale)?;

    // Sem datas, receitas e despesas consideram todo o histórico
    let stats = app_state
        .dashboard_service
        .stats(period.start_date, period.end_date)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(stats))
}

// src/handlers/interventions.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::{Paginated, PaginationParams},
        validation::{validate_business_date, validate_not_negative, validate_payload, validate_positive},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermDelete, PermWrite, RequirePermission},
    },
    models::intervention::{
        HealthIntervention, HistoryEntry, HistoryFilter, HistoryKind, InterventionFilter, InterventionStats,
        InterventionType, MortalityAnalysis, NewIntervention,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterventionPayload {
    #[validate(required(message = "O campo 'lotId' é obrigatório."))]
    pub lot_id: Option<Uuid>,
    pub pen_id: Option<Uuid>,

    #[validate(required(message = "O campo 'interventionType' é obrigatório."))]
    pub intervention_type: Option<InterventionType>,

    #[validate(
        required(message = "O campo 'productName' é obrigatório."),
        length(min = 1, max = 200, message = "O produto deve ter entre 1 e 200 caracteres.")
    )]
    #[schema(example = "Vacina contra febre aftosa")]
    pub product_name: Option<String>,

    #[validate(
        required(message = "O campo 'dose' é obrigatório."),
        custom(function = "validate_positive")
    )]
    #[schema(example = "5")]
    pub dose: Option<Decimal>,

    /// Padrão: ml
    #[validate(length(min = 1, max = 20, message = "A unidade deve ter entre 1 e 20 caracteres."))]
    pub unit: Option<String>,

    #[validate(
        required(message = "O campo 'applicationDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub application_date: Option<NaiveDate>,

    pub veterinarian: Option<String>,
    pub batch_number: Option<String>,

    /// Gera uma despesa `health_costs` quando maior que zero
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "850")]
    pub cost: Option<Decimal>,

    pub notes: Option<String>,
}

impl InterventionPayload {
    fn into_new(self, user_id: Uuid) -> NewIntervention {
        NewIntervention {
            lot_id: self.lot_id.unwrap_or_default(),
            pen_id: self.pen_id,
            intervention_type: self.intervention_type.unwrap_or(InterventionType::Treatment),
            product_name: self.product_name.unwrap_or_default().trim().to_string(),
            dose: self.dose.unwrap_or_default(),
            unit: self
                .unit
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "ml".to_string()),
            application_date: self.application_date.unwrap_or_default(),
            veterinarian: self.veterinarian,
            batch_number: self.batch_number,
            cost: self.cost.unwrap_or_default(),
            notes: self.notes,
            user_id: Some(user_id),
        }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InterventionQuery {
    pub lot_id: Option<Uuid>,
    pub pen_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub intervention_type: Option<InterventionType>,
    #[validate(custom(function = "validate_business_date"))]
    pub start_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_business_date"))]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub lot_id: Option<Uuid>,
    pub pen_id: Option<Uuid>,
    /// Restringe a um tipo de evento
    pub kind: Option<HistoryKind>,
    #[validate(custom(function = "validate_business_date"))]
    pub start_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_business_date"))]
    pub end_date: Option<NaiveDate>,
}

/// Recorte usado pelas estatísticas e pela análise de mortalidade.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnalysisQuery {
    pub lot_id: Option<Uuid>,
    #[validate(custom(function = "validate_business_date"))]
    pub start_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_business_date"))]
    pub end_date: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/v1/interventions",
    tag = "Interventions",
    params(InterventionQuery, PaginationParams),
    responses((status = 200, description = "Intervenções sanitárias", body = Paginated<HealthIntervention>)),
    security(("api_jwt" = []))
)]
pub async fn list_interventions(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<InterventionQuery>, AppError>,
    WithRejection(Query(paging), _): WithRejection<Query<PaginationParams>, AppError>,
) -> Result<Json<Paginated<HealthIntervention>>, ApiError> {
    validate_payload(&query, &locale)?;

    let filter = InterventionFilter {
        lot_id: query.lot_id,
        pen_id: query.pen_id,
        intervention_type: query.intervention_type,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let page = app_state
        .intervention_service
        .list(&filter, &paging)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/interventions/{id}",
    tag = "Interventions",
    params(("id" = Uuid, Path, description = "ID da intervenção")),
    responses(
        (status = 200, description = "Intervenção", body = HealthIntervention),
        (status = 404, description = "Intervenção não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_intervention(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<HealthIntervention>, ApiError> {
    let intervention = app_state
        .intervention_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(intervention))
}

#[utoipa::path(
    post,
    path = "/api/v1/interventions",
    tag = "Interventions",
    request_body = InterventionPayload,
    responses(
        (status = 201, description = "Intervenção registrada", body = HealthIntervention),
        (status = 400, description = "Dados inválidos, lote inexistente ou inativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_intervention(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Json(payload), _): WithRejection<Json<InterventionPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let intervention = app_state
        .intervention_service
        .create(payload.into_new(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(intervention)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/interventions/{id}",
    tag = "Interventions",
    params(("id" = Uuid, Path, description = "ID da intervenção")),
    responses(
        (status = 204, description = "Intervenção removida"),
        (status = 400, description = "A despesa gerada já foi paga")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_intervention(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDelete>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, ApiError> {
    app_state
        .intervention_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/interventions/history",
    tag = "Interventions",
    params(HistoryQuery, PaginationParams),
    responses((status = 200, description = "Linha do tempo, mais recente primeiro", body = Paginated<HistoryEntry>)),
    security(("api_jwt" = []))
)]
pub async fn get_history(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<HistoryQuery>, AppError>,
    WithRejection(Query(paging), _): WithRejection<Query<PaginationParams>, AppError>,
) -> Result<Json<Paginated<HistoryEntry>>, ApiError> {
    validate_payload(&query, &locale)?;

    let filter = HistoryFilter {
        lot_id: query.lot_id,
        pen_id: query.pen_id,
        kind: query.kind,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let page = app_state
        .intervention_service
        .history(&filter, &paging)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/interventions/stats",
    tag = "Interventions",
    params(AnalysisQuery),
    responses((status = 200, description = "Totais de intervenções, mortes, movimentações e pesagens", body = InterventionStats)),
    security(("api_jwt" = []))
)]
pub async fn get_intervention_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<AnalysisQuery>, AppError>,
) -> Result<Json<InterventionStats>, ApiError> {
    validate_payload(&query, &locale)?;

    let stats = app_state
        .intervention_service
        .stats(query.lot_id, query.start_date, query.end_date)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/mortality-analysis",
    tag = "Interventions",
    params(AnalysisQuery),
    responses((status = 200, description = "Mortes agrupadas por causa", body = MortalityAnalysis)),
    security(("api_jwt" = []))
)]
pub async fn get_mortality_analysis(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<AnalysisQuery>, AppError>,
) -> Result<Json<MortalityAnalysis>, ApiError> {
    validate_payload(&query, &locale)?;

    let analysis = app_state
        .intervention_service
        .mortality_analysis(query.lot_id, query.start_date, query.end_date)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_defaults_to_ml_and_cost_to_zero() {
        let payload: InterventionPayload = serde_json::from_str(
            r#"{"lotId": "7f1c0e7a-3b7e-4f2e-9a53-0d1f6a1c2b3d", "interventionType": "VACCINE",
                "productName": " Aftosa ", "dose": 5, "applicationDate": "2025-03-10"}"#,
        )
        .unwrap();
        assert!(payload.validate().is_ok());

        let data = payload.into_new(Uuid::new_v4());
        assert_eq!(data.unit, "ml");
        assert_eq!(data.product_name, "Aftosa");
        assert_eq!(data.cost, Decimal::ZERO);
    }

    #[test]
    fn missing_fields_and_negative_cost_are_rejected() {
        let payload: InterventionPayload =
            serde_json::from_str(r#"{"dose": 0, "cost": -10, "applicationDate": "0001-01-01"}"#).unwrap();
        let errors = payload.validate().unwrap_err();
        // lotId, interventionType, productName, dose, cost, applicationDate
        assert_eq!(errors.field_errors().len(), 6);
    }

    #[test]
    fn history_kind_is_parsed_from_the_query() {
        let query: HistoryQuery = serde_json::from_str(r#"{"kind": "MORTALITY"}"#).unwrap();
        assert_eq!(query.kind, Some(HistoryKind::Mortality));
    }
}

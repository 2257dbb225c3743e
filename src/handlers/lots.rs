// src/handlers/lots.rs

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
        validation::{validate_business_date, validate_payload, validate_positive},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermDelete, PermWrite, RequirePermission},
    },
    models::lot::{
        Lot, LotData, LotFilter, LotMovement, LotPerformance, LotStatus, MortalityRecord, WeightRecord,
    },
};

// ---
// Payload: Lot
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotPayload {
    #[validate(
        required(message = "O campo 'name' é obrigatório."),
        length(min = 1, max = 120, message = "O nome deve ter entre 1 e 120 caracteres.")
    )]
    #[schema(example = "Lote Nelore 01")]
    pub name: Option<String>,
    pub description: Option<String>,
    pub purchase_id: Option<Uuid>,

    #[validate(
        required(message = "O campo 'initialWeight' é obrigatório."),
        custom(function = "validate_positive")
    )]
    #[schema(example = "360")]
    pub initial_weight: Option<Decimal>,

    #[validate(
        required(message = "O campo 'expectedAnimals' é obrigatório."),
        range(min = 1, message = "O lote deve ter ao menos 1 animal.")
    )]
    pub expected_animals: Option<i32>,

    #[validate(
        required(message = "O campo 'entryDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub entry_date: Option<NaiveDate>,

    /// Só considerado na edição
    pub status: Option<LotStatus>,
}

impl LotPayload {
    fn into_data(self) -> (LotData, Option<LotStatus>) {
        let data = LotData {
            name: self.name.unwrap_or_default().trim().to_string(),
            description: self.description,
            purchase_id: self.purchase_id,
            initial_weight: self.initial_weight.unwrap_or_default(),
            expected_animals: self.expected_animals.unwrap_or_default(),
            entry_date: self.entry_date.unwrap_or_default(),
        };
        (data, self.status)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeightPayload {
    #[validate(
        required(message = "O campo 'weighingDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub weighing_date: Option<NaiveDate>,

    #[validate(
        required(message = "O campo 'averageWeight' é obrigatório."),
        custom(function = "validate_positive")
    )]
    #[schema(example = "412.5")]
    pub average_weight: Option<Decimal>,

    #[validate(
        required(message = "O campo 'sampleSize' é obrigatório."),
        range(min = 1, message = "A amostra deve ter ao menos 1 animal.")
    )]
    pub sample_size: Option<i32>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MortalityPayload {
    #[validate(
        required(message = "O campo 'recordDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub record_date: Option<NaiveDate>,

    #[validate(
        required(message = "O campo 'quantity' é obrigatório."),
        range(min = 1, message = "A quantidade deve ser no mínimo 1.")
    )]
    pub quantity: Option<i32>,

    #[validate(
        required(message = "O campo 'cause' é obrigatório."),
        length(min = 1, max = 200, message = "A causa deve ter entre 1 e 200 caracteres.")
    )]
    #[schema(example = "Pneumonia")]
    pub cause: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    #[validate(required(message = "O campo 'fromPenId' é obrigatório."))]
    pub from_pen_id: Option<Uuid>,

    #[validate(required(message = "O campo 'toPenId' é obrigatório."))]
    pub to_pen_id: Option<Uuid>,

    #[validate(
        required(message = "O campo 'quantity' é obrigatório."),
        range(min = 1, message = "A quantidade deve ser no mínimo 1.")
    )]
    pub quantity: Option<i32>,

    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LotQuery {
    pub status: Option<LotStatus>,
    pub pen_id: Option<Uuid>,
    /// Busca por nome
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/lots",
    tag = "Lots",
    params(LotQuery, PaginationParams),
    responses((status = 200, description = "Lotes", body = Paginated<Lot>)),
    security(("api_jwt" = []))
)]
pub async fn list_lots(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<LotQuery>, AppError>,
    WithRejection(Query(paging), _): WithRejection<Query<PaginationParams>, AppError>,
) -> Result<Json<Paginated<Lot>>, ApiError> {
    let filter = LotFilter { status: query.status, pen_id: query.pen_id, search: query.search };

    let page = app_state
        .lot_service
        .list(&filter, &paging)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}",
    tag = "Lots",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote", body = Lot),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Lot>, ApiError> {
    let lot = app_state
        .lot_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(lot))
}

#[utoipa::path(
    post,
    path = "/api/v1/lots",
    tag = "Lots",
    request_body = LotPayload,
    responses(
        (status = 201, description = "Lote criado", body = Lot),
        (status = 409, description = "Nome já utilizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Json(payload), _): WithRejection<Json<LotPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;
    let (data, _) = payload.into_data();

    let lot = app_state
        .lot_service
        .create(data)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(lot)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lots/{id}",
    tag = "Lots",
    request_body = LotPayload,
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote atualizado", body = Lot),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<LotPayload>, AppError>,
) -> Result<Json<Lot>, ApiError> {
    validate_payload(&payload, &locale)?;
    let (data, status) = payload.into_data();

    let lot = app_state
        .lot_service
        .update(id, data, status)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(lot))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lots/{id}",
    tag = "Lots",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 204, description = "Lote removido"),
        (status = 409, description = "Lote alocado em curral ou com vendas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDelete>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, ApiError> {
    app_state
        .lot_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Pesagens
// ---

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}/weights",
    tag = "Lots",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses((status = 200, description = "Pesagens, mais recente primeiro", body = Vec<WeightRecord>)),
    security(("api_jwt" = []))
)]
pub async fn list_weights(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Vec<WeightRecord>>, ApiError> {
    let records = app_state
        .lot_service
        .weights(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(records))
}

#[utoipa::path(
    post,
    path = "/api/v1/lots/{id}/weights",
    tag = "Lots",
    request_body = WeightPayload,
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses((status = 201, description = "Pesagem registrada", body = WeightRecord)),
    security(("api_jwt" = []))
)]
pub async fn add_weight(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<WeightPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let record = app_state
        .lot_service
        .add_weight(
            id,
            payload.weighing_date.unwrap_or_default(),
            payload.average_weight.unwrap_or_default(),
            payload.sample_size.unwrap_or_default(),
            payload.notes.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(record)))
}

// ---
// Mortalidade
// ---

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}/mortalities",
    tag = "Lots",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses((status = 200, description = "Registros de mortalidade", body = Vec<MortalityRecord>)),
    security(("api_jwt" = []))
)]
pub async fn list_mortalities(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Vec<MortalityRecord>>, ApiError> {
    let records = app_state
        .lot_service
        .mortalities(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(records))
}

#[utoipa::path(
    post,
    path = "/api/v1/lots/{id}/mortalities",
    tag = "Lots",
    request_body = MortalityPayload,
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 201, description = "Mortalidade registrada", body = MortalityRecord),
        (status = 400, description = "Quantidade maior que a atual do lote")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_mortality(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<MortalityPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let cause = payload.cause.unwrap_or_default();
    let record = app_state
        .lot_service
        .add_mortality(
            id,
            payload.record_date.unwrap_or_default(),
            payload.quantity.unwrap_or_default(),
            cause.trim(),
            payload.notes.as_deref(),
            Some(user.0.id),
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(record)))
}

// ---
// Movimentações
// ---

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}/movements",
    tag = "Lots",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses((status = 200, description = "Histórico, mais recente primeiro", body = Vec<LotMovement>)),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Vec<LotMovement>>, ApiError> {
    let movements = app_state
        .lot_service
        .movements(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(movements))
}

#[utoipa::path(
    post,
    path = "/api/v1/lots/{id}/transfer",
    tag = "Lots",
    request_body = TransferPayload,
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses(
        (status = 201, description = "Transferência registrada", body = LotMovement),
        (status = 400, description = "Capacidade do destino excedida ou animais insuficientes na origem")
    ),
    security(("api_jwt" = []))
)]
pub async fn transfer_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<TransferPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let movement = app_state
        .lot_service
        .transfer(
            id,
            payload.from_pen_id.unwrap_or_default(),
            payload.to_pen_id.unwrap_or_default(),
            payload.quantity.unwrap_or_default(),
            payload.reason,
            Some(user.0.id),
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(movement)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}/performance",
    tag = "Lots",
    params(("id" = Uuid, Path, description = "ID do lote")),
    responses((status = 200, description = "GMD, mortalidade e dias de cocho", body = LotPerformance)),
    security(("api_jwt" = []))
)]
pub async fn get_performance(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<LotPerformance>, ApiError> {
    let performance = app_state
        .lot_service
        .performance(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(performance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_without_animals_is_rejected() {
        let payload: LotPayload = serde_json::from_str(
            r#"{"name": "Lote 01", "initialWeight": 350, "expectedAnimals": 0, "entryDate": "2025-02-01"}"#,
        )
        .unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 1);
    }

    #[test]
    fn weighing_needs_positive_weight_and_sample() {
        let payload: WeightPayload =
            serde_json::from_str(r#"{"weighingDate": "2025-03-01", "averageWeight": 0, "sampleSize": 0}"#).unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 2);
    }

    #[test]
    fn transfer_requires_both_pens() {
        let payload: TransferPayload = serde_json::from_str(r#"{"quantity": 10}"#).unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 2);
    }

    #[test]
    fn status_is_carried_to_update() {
        let payload: LotPayload = serde_json::from_str(
            r#"{"name": " Lote 02 ", "initialWeight": 350, "expectedAnimals": 40, "entryDate": "2025-02-01", "status": "CLOSED"}"#,
        )
        .unwrap();
        let (data, status) = payload.into_data();
        assert_eq!(data.name, "Lote 02");
        assert_eq!(status, Some(LotStatus::Closed));
    }
}

// src/handlers/pens.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::validate_payload,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermDelete, PermWrite, RequirePermission},
    },
    models::pen::{Pen, PenAllocation, PenData, PenOccupancy, PenStatus},
};

// ---
// Payload: Pen
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PenPayload {
    #[validate(
        required(message = "O campo 'name' é obrigatório."),
        length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres.")
    )]
    #[schema(example = "Curral 07")]
    pub name: Option<String>,

    #[validate(
        required(message = "O campo 'capacity' é obrigatório."),
        range(min = 1, message = "A capacidade deve ser no mínimo 1.")
    )]
    #[schema(example = 120)]
    pub capacity: Option<i32>,

    pub location: Option<String>,
    pub status: Option<PenStatus>,
    pub is_active: Option<bool>,
}

impl PenPayload {
    fn into_data(self) -> PenData {
        PenData {
            name: self.name.unwrap_or_default().trim().to_string(),
            capacity: self.capacity.unwrap_or_default(),
            location: self.location,
            status: self.status.unwrap_or(PenStatus::Available),
            is_active: self.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPayload {
    #[validate(required(message = "O campo 'lotId' é obrigatório."))]
    pub lot_id: Option<Uuid>,

    #[validate(
        required(message = "O campo 'quantity' é obrigatório."),
        range(min = 1, message = "A quantidade deve ser no mínimo 1.")
    )]
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PenQuery {
    pub status: Option<PenStatus>,
}

#[utoipa::path(
    get,
    path = "/api/v1/pens",
    tag = "Pens",
    params(PenQuery),
    responses((status = 200, description = "Currais", body = Vec<Pen>)),
    security(("api_jwt" = []))
)]
pub async fn list_pens(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<PenQuery>, AppError>,
) -> Result<Json<Vec<Pen>>, ApiError> {
    let pens = app_state
        .pen_service
        .list(query.status)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(pens))
}

#[utoipa::path(
    get,
    path = "/api/v1/pens/{id}",
    tag = "Pens",
    params(("id" = Uuid, Path, description = "ID do curral")),
    responses(
        (status = 200, description = "Curral", body = Pen),
        (status = 404, description = "Curral não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_pen(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Pen>, ApiError> {
    let pen = app_state
        .pen_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(pen))
}

#[utoipa::path(
    post,
    path = "/api/v1/pens",
    tag = "Pens",
    request_body = PenPayload,
    responses(
        (status = 201, description = "Curral cadastrado", body = Pen),
        (status = 409, description = "Nome já utilizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_pen(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Json(payload), _): WithRejection<Json<PenPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let pen = app_state
        .pen_service
        .create(payload.into_data())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(pen)))
}

#[utoipa::path(
    put,
    path = "/api/v1/pens/{id}",
    tag = "Pens",
    request_body = PenPayload,
    params(("id" = Uuid, Path, description = "ID do curral")),
    responses(
        (status = 200, description = "Curral atualizado", body = Pen),
        (status = 400, description = "Capacidade abaixo da ocupação ou curral com animais")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_pen(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<PenPayload>, AppError>,
) -> Result<Json<Pen>, ApiError> {
    validate_payload(&payload, &locale)?;

    let pen = app_state
        .pen_service
        .update(id, payload.into_data())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(pen))
}

#[utoipa::path(
    delete,
    path = "/api/v1/pens/{id}",
    tag = "Pens",
    params(("id" = Uuid, Path, description = "ID do curral")),
    responses(
        (status = 204, description = "Curral removido"),
        (status = 400, description = "Curral com animais")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_pen(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDelete>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, ApiError> {
    app_state
        .pen_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/pens/{id}/occupancy",
    tag = "Pens",
    params(("id" = Uuid, Path, description = "ID do curral")),
    responses((status = 200, description = "Ocupação atual", body = PenOccupancy)),
    security(("api_jwt" = []))
)]
pub async fn get_occupancy(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<PenOccupancy>, ApiError> {
    let occupancy = app_state
        .pen_service
        .occupancy(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(occupancy))
}

#[utoipa::path(
    post,
    path = "/api/v1/pens/{id}/allocations",
    tag = "Pens",
    request_body = AllocationPayload,
    params(("id" = Uuid, Path, description = "ID do curral")),
    responses(
        (status = 201, description = "Lote alocado", body = PenAllocation),
        (status = 400, description = "Capacidade excedida, curral indisponível ou animais insuficientes")
    ),
    security(("api_jwt" = []))
)]
pub async fn allocate_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<AllocationPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let allocation = app_state
        .pen_service
        .allocate(
            id,
            payload.lot_id.unwrap_or_default(),
            payload.quantity.unwrap_or_default(),
            Some(user.0.id),
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(allocation)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/pens/{id}/allocations/{allocation_id}",
    tag = "Pens",
    params(
        ("id" = Uuid, Path, description = "ID do curral"),
        ("allocation_id" = Uuid, Path, description = "ID da alocação")
    ),
    responses(
        (status = 200, description = "Alocação liberada", body = PenAllocation),
        (status = 404, description = "Alocação não encontrada ou já liberada")
    ),
    security(("api_jwt" = []))
)]
pub async fn release_allocation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path((id, allocation_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
) -> Result<Json<PenAllocation>, ApiError> {
    let released = app_state
        .pen_service
        .release(id, allocation_id, Some(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(released))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        let payload: PenPayload = serde_json::from_str(r#"{"name": "Curral 01", "capacity": 0}"#).unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 1);
    }

    #[test]
    fn new_pen_defaults_to_available_and_active() {
        let payload: PenPayload = serde_json::from_str(r#"{"name": "Curral 02", "capacity": 80}"#).unwrap();
        assert!(payload.validate().is_ok());

        let data = payload.into_data();
        assert_eq!(data.status, PenStatus::Available);
        assert!(data.is_active);
    }

    #[test]
    fn allocation_needs_lot_and_quantity() {
        let payload: AllocationPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 2);
    }
}

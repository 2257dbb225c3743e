// src/handlers/sales.rs

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
        validation::{validate_business_date, validate_payload, validate_positive, validate_unit_price},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermDelete, PermWrite, RequirePermission},
    },
    models::sale::{PipelineStage, SaleData, SaleFilter, SalePaymentType, SaleRecord, SaleStatus},
};

// ---
// Payload: Sale
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalePayload {
    #[validate(required(message = "O campo 'lotId' é obrigatório."))]
    pub lot_id: Option<Uuid>,

    #[validate(required(message = "O campo 'buyerId' é obrigatório."))]
    pub buyer_id: Option<Uuid>,

    #[validate(
        required(message = "O campo 'saleDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub sale_date: Option<NaiveDate>,

    #[validate(
        required(message = "O campo 'quantity' é obrigatório."),
        range(min = 1, message = "A quantidade deve ser no mínimo 1.")
    )]
    pub quantity: Option<i32>,

    #[validate(
        required(message = "O campo 'totalWeight' é obrigatório."),
        custom(function = "validate_positive")
    )]
    #[schema(example = "18500")]
    pub total_weight: Option<Decimal>,

    #[validate(
        required(message = "O campo 'pricePerKg' é obrigatório."),
        custom(function = "validate_unit_price")
    )]
    #[schema(example = "11.2")]
    pub price_per_kg: Option<Decimal>,

    pub payment_type: Option<SalePaymentType>,
    #[validate(custom(function = "validate_business_date"))]
    pub payment_due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl SalePayload {
    fn into_data(self) -> SaleData {
        SaleData {
            lot_id: self.lot_id.unwrap_or_default(),
            buyer_id: self.buyer_id.unwrap_or_default(),
            sale_date: self.sale_date.unwrap_or_default(),
            quantity: self.quantity.unwrap_or_default(),
            total_weight: self.total_weight.unwrap_or_default(),
            price_per_kg: self.price_per_kg.unwrap_or_default(),
            payment_type: self.payment_type.unwrap_or(SalePaymentType::Cash),
            payment_due_date: self.payment_due_date,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaleStatusPayload {
    pub status: SaleStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SaleQuery {
    pub status: Option<SaleStatus>,
    pub lot_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/sales",
    tag = "Sales",
    params(SaleQuery, PaginationParams),
    responses((status = 200, description = "Vendas", body = Paginated<SaleRecord>)),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<SaleQuery>, AppError>,
    WithRejection(Query(paging), _): WithRejection<Query<PaginationParams>, AppError>,
) -> Result<Json<Paginated<SaleRecord>>, ApiError> {
    let filter = SaleFilter { status: query.status, lot_id: query.lot_id, buyer_id: query.buyer_id };

    let page = app_state
        .sale_service
        .list(&filter, &paging)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/pipeline",
    tag = "Sales",
    responses((status = 200, description = "Quantidade e valor por status (kanban)", body = Vec<PipelineStage>)),
    security(("api_jwt" = []))
)]
pub async fn get_pipeline(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Json<Vec<PipelineStage>>, ApiError> {
    let stages = app_state
        .sale_service
        .pipeline()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(stages))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda", body = SaleRecord),
        (status = 404, description = "Venda não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<SaleRecord>, ApiError> {
    let sale = app_state
        .sale_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(sale))
}

#[utoipa::path(
    post,
    path = "/api/v1/sales",
    tag = "Sales",
    request_body = SalePayload,
    responses(
        (status = 201, description = "Venda registrada", body = SaleRecord),
        (status = 400, description = "Lote sem animais suficientes")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Json(payload), _): WithRejection<Json<SalePayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let sale = app_state
        .sale_service
        .create(payload.into_data())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(sale)))
}

#[utoipa::path(
    put,
    path = "/api/v1/sales/{id}",
    tag = "Sales",
    request_body = SalePayload,
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda atualizada", body = SaleRecord),
        (status = 400, description = "Venda concluída não pode ser alterada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<SalePayload>, AppError>,
) -> Result<Json<SaleRecord>, ApiError> {
    validate_payload(&payload, &locale)?;

    let sale = app_state
        .sale_service
        .update(id, payload.into_data())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(sale))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sales/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 204, description = "Venda removida"),
        (status = 400, description = "Venda concluída não pode ser removida")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDelete>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, ApiError> {
    app_state
        .sale_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/api/v1/sales/{id}/status",
    tag = "Sales",
    request_body = SaleStatusPayload,
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Status alterado", body = SaleRecord),
        (status = 400, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_sale_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<SaleStatusPayload>, AppError>,
) -> Result<Json<SaleRecord>, ApiError> {
    let sale = app_state
        .sale_service
        .update_status(id, payload.status, Some(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(sale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_without_weight_is_rejected() {
        let payload: SalePayload = serde_json::from_value(serde_json::json!({
            "lotId": Uuid::new_v4(),
            "buyerId": Uuid::new_v4(),
            "saleDate": "2025-06-01",
            "quantity": 20,
            "pricePerKg": 11.2
        }))
        .unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 1);
    }

    #[test]
    fn payment_type_defaults_to_cash() {
        let payload: SalePayload = serde_json::from_value(serde_json::json!({
            "lotId": Uuid::new_v4(),
            "buyerId": Uuid::new_v4(),
            "saleDate": "2025-06-01",
            "quantity": 20,
            "totalWeight": 10000,
            "pricePerKg": 11.2
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.into_data().payment_type, SalePaymentType::Cash);
    }

    #[test]
    fn price_beyond_the_column_precision_is_rejected() {
        let payload: SalePayload = serde_json::from_value(serde_json::json!({
            "lotId": Uuid::new_v4(),
            "buyerId": Uuid::new_v4(),
            "saleDate": "2025-06-01",
            "quantity": 20,
            "totalWeight": 100000000000000.0,
            "pricePerKg": 1000000000000.0
        }))
        .unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 2);
    }

    #[test]
    fn unknown_status_does_not_deserialize() {
        assert!(serde_json::from_str::<SaleStatusPayload>(r#"{"status": "SHIPPED"}"#).is_err());
    }
}

// src/handlers/cattle_purchases.rs

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
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::{Paginated, PaginationParams},
        validation::{
            validate_business_date, validate_not_negative, validate_payload, validate_percentage,
            validate_positive,
        },
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermDelete, PermWrite, RequirePermission},
    },
    models::cattle_purchase::{
        AnimalType, CattlePurchase, PurchaseFilter, PurchaseInput, PurchasePaymentType, PurchaseStatus,
    },
};

// Peso vivo total: no mínimo 1 kg
fn validate_purchase_weight(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ONE {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &1.0);
        err.message = Some("O peso de compra deve ser de no mínimo 1 kg.".into());
        return Err(err);
    }
    validate_positive(val)
}

// ---
// Payload: CattlePurchase
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CattlePurchasePayload {
    #[validate(required(message = "O campo 'vendorId' é obrigatório."))]
    pub vendor_id: Option<Uuid>,

    #[validate(required(message = "O campo 'payerAccountId' é obrigatório."))]
    pub payer_account_id: Option<Uuid>,

    #[validate(
        required(message = "O campo 'purchaseDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub purchase_date: Option<NaiveDate>,

    #[validate(required(message = "O campo 'animalType' é obrigatório."))]
    pub animal_type: Option<AnimalType>,

    #[validate(
        required(message = "O campo 'initialQuantity' é obrigatório."),
        range(min = 1, message = "A quantidade inicial deve ser no mínimo 1.")
    )]
    #[schema(example = 100)]
    pub initial_quantity: Option<i32>,

    #[validate(
        required(message = "O campo 'purchaseWeight' é obrigatório."),
        custom(function = "validate_purchase_weight")
    )]
    #[schema(example = "36000")]
    pub purchase_weight: Option<Decimal>,

    #[validate(
        required(message = "O campo 'carcassYield' é obrigatório."),
        custom(function = "validate_percentage")
    )]
    #[schema(example = "52")]
    pub carcass_yield: Option<Decimal>,

    #[validate(
        required(message = "O campo 'pricePerArroba' é obrigatório."),
        custom(function = "validate_not_negative")
    )]
    #[schema(example = "310")]
    pub price_per_arroba: Option<Decimal>,

    #[validate(required(message = "O campo 'paymentType' é obrigatório."))]
    pub payment_type: Option<PurchasePaymentType>,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub freight_cost: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub commission: Decimal,

    pub notes: Option<String>,
}

impl CattlePurchasePayload {
    fn into_input(self) -> PurchaseInput {
        PurchaseInput {
            vendor_id: self.vendor_id.unwrap_or_default(),
            payer_account_id: self.payer_account_id.unwrap_or_default(),
            purchase_date: self.purchase_date.unwrap_or_default(),
            animal_type: self.animal_type.unwrap_or(AnimalType::Mixed),
            initial_quantity: self.initial_quantity.unwrap_or_default(),
            purchase_weight: self.purchase_weight.unwrap_or_default(),
            carcass_yield: self.carcass_yield.unwrap_or_default(),
            price_per_arroba: self.price_per_arroba.unwrap_or_default(),
            payment_type: self.payment_type.unwrap_or(PurchasePaymentType::Cash),
            freight_cost: self.freight_cost,
            commission: self.commission,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionPayload {
    #[validate(
        required(message = "O campo 'receivedDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub received_date: Option<NaiveDate>,

    #[validate(
        required(message = "O campo 'receivedWeight' é obrigatório."),
        custom(function = "validate_positive")
    )]
    pub received_weight: Option<Decimal>,

    #[validate(
        required(message = "O campo 'actualQuantity' é obrigatório."),
        range(min = 0, message = "A quantidade recebida não pode ser negativa.")
    )]
    pub actual_quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeathsPayload {
    #[validate(range(min = 1, message = "Informe ao menos 1 morte."))]
    pub count: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PurchaseQuery {
    pub status: Option<PurchaseStatus>,
    pub vendor_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/cattle-purchases",
    tag = "Cattle Purchases",
    params(PurchaseQuery, PaginationParams),
    responses((status = 200, description = "Compras de gado", body = Paginated<CattlePurchase>)),
    security(("api_jwt" = []))
)]
pub async fn list_purchases(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<PurchaseQuery>, AppError>,
    WithRejection(Query(paging), _): WithRejection<Query<PaginationParams>, AppError>,
) -> Result<Json<Paginated<CattlePurchase>>, ApiError> {
    let filter = PurchaseFilter { status: query.status, vendor_id: query.vendor_id };

    let page = app_state
        .cattle_purchase_service
        .list(&filter, &paging)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/cattle-purchases/{id}",
    tag = "Cattle Purchases",
    params(("id" = Uuid, Path, description = "ID da compra")),
    responses(
        (status = 200, description = "Compra", body = CattlePurchase),
        (status = 404, description = "Compra não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_purchase(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<CattlePurchase>, ApiError> {
    let purchase = app_state
        .cattle_purchase_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(purchase))
}

#[utoipa::path(
    post,
    path = "/api/v1/cattle-purchases",
    tag = "Cattle Purchases",
    request_body = CattlePurchasePayload,
    responses(
        (status = 201, description = "Compra registrada com despesas lançadas", body = CattlePurchase),
        (status = 400, description = "Dados inválidos, fornecedor ou conta inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_purchase(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Json(payload), _): WithRejection<Json<CattlePurchasePayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let purchase = app_state
        .cattle_purchase_service
        .create(payload.into_input(), Some(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(purchase)))
}

#[utoipa::path(
    put,
    path = "/api/v1/cattle-purchases/{id}",
    tag = "Cattle Purchases",
    request_body = CattlePurchasePayload,
    params(("id" = Uuid, Path, description = "ID da compra")),
    responses(
        (status = 200, description = "Compra atualizada e valores recalculados", body = CattlePurchase),
        (status = 404, description = "Compra não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_purchase(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<CattlePurchasePayload>, AppError>,
) -> Result<Json<CattlePurchase>, ApiError> {
    validate_payload(&payload, &locale)?;

    let purchase = app_state
        .cattle_purchase_service
        .update(id, payload.into_input(), Some(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(purchase))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cattle-purchases/{id}",
    tag = "Cattle Purchases",
    params(("id" = Uuid, Path, description = "ID da compra")),
    responses(
        (status = 204, description = "Compra removida junto com as despesas geradas"),
        (status = 404, description = "Compra não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_purchase(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDelete>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, ApiError> {
    app_state
        .cattle_purchase_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/cattle-purchases/{id}/reception",
    tag = "Cattle Purchases",
    request_body = ReceptionPayload,
    params(("id" = Uuid, Path, description = "ID da compra")),
    responses(
        (status = 200, description = "Recepção registrada", body = CattlePurchase),
        (status = 400, description = "Compra não está confirmada ou quantidade inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_reception(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<ReceptionPayload>, AppError>,
) -> Result<Json<CattlePurchase>, ApiError> {
    validate_payload(&payload, &locale)?;

    let purchase = app_state
        .cattle_purchase_service
        .register_reception(
            id,
            payload.received_date.unwrap_or_default(),
            payload.received_weight.unwrap_or_default(),
            payload.actual_quantity.unwrap_or_default(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(purchase))
}

#[utoipa::path(
    post,
    path = "/api/v1/cattle-purchases/{id}/deaths",
    tag = "Cattle Purchases",
    request_body = DeathsPayload,
    params(("id" = Uuid, Path, description = "ID da compra")),
    responses(
        (status = 200, description = "Mortes registradas", body = CattlePurchase),
        (status = 400, description = "Quantidade maior que a atual")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_deaths(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<DeathsPayload>, AppError>,
) -> Result<Json<CattlePurchase>, ApiError> {
    validate_payload(&payload, &locale)?;

    let purchase = app_state
        .cattle_purchase_service
        .register_deaths(id, payload.count)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(purchase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> serde_json::Value {
        serde_json::json!({
            "vendorId": Uuid::new_v4(),
            "payerAccountId": Uuid::new_v4(),
            "purchaseDate": "2025-03-05",
            "animalType": "MALE",
            "initialQuantity": 100,
            "purchaseWeight": 36000,
            "carcassYield": 52,
            "pricePerArroba": 310,
            "paymentType": "CASH",
            "freightCost": 4500
        })
    }

    #[test]
    fn complete_payload_is_valid() {
        let payload: CattlePurchasePayload = serde_json::from_value(valid_json()).unwrap();
        assert!(payload.validate().is_ok());

        let input = payload.into_input();
        assert_eq!(input.initial_quantity, 100);
        assert_eq!(input.commission, Decimal::ZERO);
    }

    #[test]
    fn carcass_yield_above_one_hundred_is_rejected() {
        let mut json = valid_json();
        json["carcassYield"] = serde_json::json!(120);
        let payload: CattlePurchasePayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 1);
    }

    #[test]
    fn zero_quantity_and_light_weight_are_rejected() {
        let mut json = valid_json();
        json["initialQuantity"] = serde_json::json!(0);
        json["purchaseWeight"] = serde_json::json!(0.5);
        let payload: CattlePurchasePayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 2);
    }

    #[test]
    fn oversized_weight_and_freight_are_rejected() {
        let mut json = valid_json();
        json["purchaseWeight"] = serde_json::json!(7.0e28);
        json["freightCost"] = serde_json::json!(100000000000000.0);
        let payload: CattlePurchasePayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.validate().unwrap_err().field_errors().len(), 2);
    }

    #[test]
    fn deaths_require_at_least_one() {
        let payload = DeathsPayload { count: 0 };
        assert!(payload.validate().is_err());
    }
}

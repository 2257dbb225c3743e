// src/handlers/partners.rs

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
        pagination::{Paginated, PaginationParams},
        validation::validate_payload,
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermDelete, PermWrite, RequirePermission},
    },
    models::partner::{Partner, PartnerData, PartnerFilter, PartnerType},
};

// ---
// Payload: Partner
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPayload {
    #[validate(
        required(message = "O campo 'name' é obrigatório."),
        length(min = 1, max = 200, message = "O nome deve ter entre 1 e 200 caracteres.")
    )]
    #[schema(example = "Fazenda Santa Fé")]
    pub name: Option<String>,

    #[validate(required(message = "O campo 'type' é obrigatório."))]
    #[serde(rename = "type")]
    pub partner_type: Option<PartnerType>,

    #[validate(length(max = 20, message = "CPF/CNPJ deve ter no máximo 20 caracteres."))]
    pub cpf_cnpj: Option<String>,
    pub phone: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl PartnerPayload {
    fn into_data(self) -> PartnerData {
        PartnerData {
            name: self.name.unwrap_or_default(),
            partner_type: self.partner_type.unwrap_or(PartnerType::Other),
            cpf_cnpj: self.cpf_cnpj,
            phone: self.phone,
            email: self.email,
            address: self.address,
            notes: self.notes,
            is_active: self.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PartnerQuery {
    #[serde(rename = "type")]
    pub partner_type: Option<PartnerType>,
    /// Busca por nome ou CPF/CNPJ
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/v1/partners",
    tag = "Partners",
    params(PartnerQuery, PaginationParams),
    responses((status = 200, description = "Parceiros", body = Paginated<Partner>)),
    security(("api_jwt" = []))
)]
pub async fn list_partners(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<PartnerQuery>, AppError>,
    WithRejection(Query(paging), _): WithRejection<Query<PaginationParams>, AppError>,
) -> Result<Json<Paginated<Partner>>, ApiError> {
    let filter = PartnerFilter {
        partner_type: query.partner_type,
        search: query.search,
        is_active: query.is_active,
    };

    let page = app_state
        .partner_service
        .list(&filter, &paging)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/partners/{id}",
    tag = "Partners",
    params(("id" = Uuid, Path, description = "ID do parceiro")),
    responses(
        (status = 200, description = "Parceiro", body = Partner),
        (status = 404, description = "Parceiro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_partner(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Partner>, ApiError> {
    let partner = app_state
        .partner_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(partner))
}

#[utoipa::path(
    post,
    path = "/api/v1/partners",
    tag = "Partners",
    request_body = PartnerPayload,
    responses(
        (status = 201, description = "Parceiro criado", body = Partner),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "CPF/CNPJ já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_partner(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Json(payload), _): WithRejection<Json<PartnerPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let partner = app_state
        .partner_service
        .create(payload.into_data())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(partner)))
}

#[utoipa::path(
    put,
    path = "/api/v1/partners/{id}",
    tag = "Partners",
    request_body = PartnerPayload,
    params(("id" = Uuid, Path, description = "ID do parceiro")),
    responses(
        (status = 200, description = "Parceiro atualizado", body = Partner),
        (status = 404, description = "Parceiro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_partner(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<PartnerPayload>, AppError>,
) -> Result<Json<Partner>, ApiError> {
    validate_payload(&payload, &locale)?;

    let partner = app_state
        .partner_service
        .update(id, payload.into_data())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(partner))
}

#[utoipa::path(
    delete,
    path = "/api/v1/partners/{id}",
    tag = "Partners",
    params(("id" = Uuid, Path, description = "ID do parceiro")),
    responses(
        (status = 204, description = "Parceiro removido"),
        (status = 404, description = "Parceiro não encontrado"),
        (status = 409, description = "Parceiro vinculado a compras ou vendas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_partner(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDelete>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, ApiError> {
    app_state
        .partner_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_name_and_type_are_reported_per_field() {
        let payload: PartnerPayload = serde_json::from_str(r#"{"cpfCnpj": "123"}"#).unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("name"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn type_is_read_from_the_type_key() {
        let payload: PartnerPayload =
            serde_json::from_str(r#"{"name": "Frigorífico Boi Gordo", "type": "BUYER"}"#).unwrap();
        assert!(payload.validate().is_ok());

        let data = payload.into_data();
        assert_eq!(data.partner_type, PartnerType::Buyer);
        assert!(data.is_active);
    }

    #[test]
    fn invalid_email_is_rejected() {
        let payload: PartnerPayload =
            serde_json::from_str(r#"{"name": "X", "type": "VENDOR", "email": "nope"}"#).unwrap();
        assert!(payload.validate().unwrap_err().field_errors().contains_key("email"));
    }
}

// src/models/partner.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "partner_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerType {
    Vendor, // Fornecedor de gado
    Buyer,  // Frigorífico / comprador
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: Uuid,

    #[schema(example = "Fazenda Santa Fé")]
    pub name: String,

    #[serde(rename = "type")]
    pub partner_type: PartnerType,

    #[schema(example = "12.345.678/0001-90")]
    pub cpf_cnpj: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Campos gravados na criação/edição de um parceiro.
#[derive(Debug, Clone)]
pub struct PartnerData {
    pub name: String,
    pub partner_type: PartnerType,
    pub cpf_cnpj: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PartnerFilter {
    pub partner_type: Option<PartnerType>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

// src/models/cattle_purchase.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Uma arroba equivale a 15 kg de carcaça.
pub const KG_PER_ARROBA: Decimal = Decimal::from_parts(15, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "animal_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimalType {
    Male,
    Female,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "purchase_payment_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchasePaymentType {
    Cash,
    Installment,
    Barter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "purchase_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Confirmed,
    Received,
    Confined,
    Sold,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CattlePurchase {
    pub id: Uuid,

    #[schema(example = "LOT-2503001")]
    pub lot_code: String,

    pub vendor_id: Uuid,
    pub payer_account_id: Uuid,
    pub purchase_date: NaiveDate,
    pub animal_type: AnimalType,

    #[schema(example = 100)]
    pub initial_quantity: i32,
    pub current_quantity: i32,
    pub death_count: i32,

    /// Peso vivo total (kg)
    #[schema(example = "36000.00")]
    pub purchase_weight: Decimal,
    /// Rendimento de carcaça (%)
    #[schema(example = "52.00")]
    pub carcass_yield: Decimal,
    #[schema(example = "310.00")]
    pub price_per_arroba: Decimal,

    pub payment_type: PurchasePaymentType,
    pub freight_cost: Decimal,
    pub commission: Decimal,

    // Calculados
    pub purchase_value: Decimal,
    pub total_cost: Decimal,
    pub average_weight: Decimal,

    pub status: PurchaseStatus,

    // Recepção
    pub received_date: Option<NaiveDate>,
    pub received_weight: Option<Decimal>,
    pub weight_break_percentage: Option<Decimal>,
    pub transport_mortality: Option<i32>,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entradas informadas pelo usuário. Os valores derivados saem de `PurchaseTotals`.
#[derive(Debug, Clone)]
pub struct PurchaseInput {
    pub vendor_id: Uuid,
    pub payer_account_id: Uuid,
    pub purchase_date: NaiveDate,
    pub animal_type: AnimalType,
    pub initial_quantity: i32,
    pub purchase_weight: Decimal,
    pub carcass_yield: Decimal,
    pub price_per_arroba: Decimal,
    pub payment_type: PurchasePaymentType,
    pub freight_cost: Decimal,
    pub commission: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseTotals {
    pub purchase_value: Decimal,
    pub total_cost: Decimal,
    pub average_weight: Decimal,
}

#[derive(Debug, Clone)]
pub struct Reception {
    pub received_date: NaiveDate,
    pub received_weight: Decimal,
    pub actual_quantity: i32,
    pub weight_break_percentage: Decimal,
    pub transport_mortality: i32,
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseFilter {
    pub status: Option<PurchaseStatus>,
    pub vendor_id: Option<Uuid>,
}

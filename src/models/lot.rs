// src/models/lot.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lot_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Active,
    Sold,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Allocation,
    Release,
    Transfer,
    Death,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: Uuid,

    #[schema(example = "Lote Nelore 01")]
    pub name: String,
    pub description: Option<String>,

    pub purchase_id: Option<Uuid>,
    /// Curral principal atual
    pub pen_id: Option<Uuid>,

    /// Peso médio por cabeça na entrada (kg)
    #[schema(example = "360.00")]
    pub initial_weight: Decimal,
    pub expected_animals: i32,
    pub current_quantity: i32,
    pub entry_date: NaiveDate,
    pub status: LotStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LotData {
    pub name: String,
    pub description: Option<String>,
    pub purchase_id: Option<Uuid>,
    pub initial_weight: Decimal,
    pub expected_animals: i32,
    pub entry_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeightRecord {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub weighing_date: NaiveDate,
    #[schema(example = "412.50")]
    pub average_weight: Decimal,
    pub sample_size: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MortalityRecord {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub record_date: NaiveDate,
    pub quantity: i32,
    #[schema(example = "Pneumonia")]
    pub cause: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotMovement {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub movement_type: MovementType,
    pub from_pen_id: Option<Uuid>,
    pub to_pen_id: Option<Uuid>,
    pub quantity: i32,
    pub reason: Option<String>,
    pub user_id: Option<Uuid>,
    pub movement_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub lot_id: Uuid,
    pub movement_type: MovementType,
    pub from_pen_id: Option<Uuid>,
    pub to_pen_id: Option<Uuid>,
    pub quantity: i32,
    pub reason: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Indicadores de desempenho (GMD, mortalidade, dias de cocho).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotPerformance {
    pub lot_id: Uuid,
    pub initial_weight: Decimal,
    pub current_average_weight: Decimal,
    pub total_gain: Decimal,
    pub days_on_feed: i64,
    /// kg/cabeça/dia
    pub average_daily_gain: Decimal,
    pub total_deaths: i64,
    pub mortality_rate: Decimal,
    pub weighings_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct LotFilter {
    pub status: Option<LotStatus>,
    pub pen_id: Option<Uuid>,
    pub search: Option<String>,
}

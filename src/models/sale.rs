// src/models/sale.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_payment_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalePaymentType {
    Cash,
    Installment,
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    Confirmed,
    Delivered,
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub const ALL: [SaleStatus; 5] = [
        SaleStatus::Pending,
        SaleStatus::Confirmed,
        SaleStatus::Delivered,
        SaleStatus::Completed,
        SaleStatus::Cancelled,
    ];

    /// Transições permitidas no pipeline de vendas.
    pub fn can_transition_to(self, next: SaleStatus) -> bool {
        use SaleStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Delivered)
                | (Confirmed, Cancelled)
                | (Delivered, Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SaleStatus::Pending => "PENDING",
            SaleStatus::Confirmed => "CONFIRMED",
            SaleStatus::Delivered => "DELIVERED",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub id: Uuid,

    #[schema(example = "VND-2503001")]
    pub sale_number: String,

    pub lot_id: Uuid,
    pub buyer_id: Uuid,
    pub sale_date: NaiveDate,
    pub quantity: i32,

    #[schema(example = "18500.00")]
    pub total_weight: Decimal,
    #[schema(example = "11.2000")]
    pub price_per_kg: Decimal,
    pub total_amount: Decimal,

    pub payment_type: SalePaymentType,
    pub payment_due_date: Option<NaiveDate>,
    pub status: SaleStatus,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SaleData {
    pub lot_id: Uuid,
    pub buyer_id: Uuid,
    pub sale_date: NaiveDate,
    pub quantity: i32,
    pub total_weight: Decimal,
    pub price_per_kg: Decimal,
    pub payment_type: SalePaymentType,
    pub payment_due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Uma coluna do kanban de vendas.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub status: SaleStatus,
    pub count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub lot_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::SaleStatus::*;

    #[test]
    fn pipeline_moves_forward_only() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Delivered.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn cancellation_only_before_delivery() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }
}

// src/models/pen.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pen_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PenStatus {
    Available,
    Occupied,
    Maintenance,
    Quarantine,
}

impl PenStatus {
    /// Currais em manutenção ou quarentena não recebem animais.
    pub fn accepts_animals(self) -> bool {
        matches!(self, PenStatus::Available | PenStatus::Occupied)
    }

    /// Status após uma mudança de ocupação. Manutenção e quarentena não mudam sozinhas.
    pub fn after_occupancy_change(self, capacity: i32, occupied: i64) -> PenStatus {
        match self {
            PenStatus::Available if occupied >= capacity as i64 => PenStatus::Occupied,
            PenStatus::Occupied if occupied < capacity as i64 => PenStatus::Available,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "allocation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Active,
    Released,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pen {
    pub id: Uuid,

    #[schema(example = "Curral 07")]
    pub name: String,

    #[schema(example = 120)]
    pub capacity: i32,
    pub location: Option<String>,
    pub status: PenStatus,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PenData {
    pub name: String,
    pub capacity: i32,
    pub location: Option<String>,
    pub status: PenStatus,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PenAllocation {
    pub id: Uuid,
    pub pen_id: Uuid,
    pub lot_id: Uuid,
    pub quantity: i32,
    pub status: AllocationStatus,
    pub allocated_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PenOccupancy {
    pub pen_id: Uuid,
    pub capacity: i32,
    pub occupied: i64,
    pub available: i64,
    /// Percentual ocupado (0 a 100)
    pub occupancy_rate: Decimal,
    pub allocations: Vec<PenAllocation>,
}

#[cfg(test)]
mod tests {
    use super::PenStatus::*;

    #[test]
    fn full_pen_becomes_occupied_and_frees_up_again() {
        assert_eq!(Available.after_occupancy_change(50, 50), Occupied);
        assert_eq!(Available.after_occupancy_change(50, 49), Available);
        assert_eq!(Occupied.after_occupancy_change(50, 10), Available);
        assert_eq!(Occupied.after_occupancy_change(50, 50), Occupied);
    }

    #[test]
    fn maintenance_and_quarantine_are_sticky() {
        assert_eq!(Maintenance.after_occupancy_change(10, 10), Maintenance);
        assert_eq!(Quarantine.after_occupancy_change(10, 0), Quarantine);
        assert!(!Maintenance.accepts_animals());
        assert!(Occupied.accepts_animals());
    }
}

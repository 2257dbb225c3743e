// src/models/dashboard.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::finance::CashFlowSnapshot;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Cabeças em lotes ativos
    pub total_cattle: i64,
    pub active_lots: i64,
    pub occupied_pens: i64,
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_profit: Decimal,
    /// Média ponderada por cabeça (kg)
    pub average_weight: Decimal,
    /// Percentual sobre os animais esperados
    pub mortality_rate: Decimal,
    pub cash_flow: CashFlowSnapshot,
    /// GMD médio dos lotes ativos já pesados (kg/cabeça/dia)
    pub performance_index: Decimal,
}

// Linha "crua" de um lote ativo, usada nos agregados do painel
#[derive(Debug, Clone, FromRow)]
pub struct ActiveLotSnapshot {
    pub current_quantity: i32,
    pub expected_animals: i32,
    pub initial_weight: Decimal,
    pub entry_date: NaiveDate,
    pub latest_weight: Option<Decimal>,
    pub total_deaths: i64,
}

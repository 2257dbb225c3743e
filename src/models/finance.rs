// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Catálogo de categorias ---

/// Grupos do DRE em que cada categoria de despesa cai.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseGroup {
    Acquisition,
    Operational,
    Administrative,
    Financial,
}

pub const EXPENSE_CATEGORIES: &[(&str, ExpenseGroup)] = &[
    ("animal_purchase", ExpenseGroup::Acquisition),
    ("commission", ExpenseGroup::Acquisition),
    ("freight", ExpenseGroup::Acquisition),
    ("acquisition_other", ExpenseGroup::Acquisition),
    ("feed", ExpenseGroup::Operational),
    ("health_costs", ExpenseGroup::Operational),
    ("operational_costs", ExpenseGroup::Operational),
    ("deaths", ExpenseGroup::Operational),
    ("weight_loss", ExpenseGroup::Operational),
    ("general_admin", ExpenseGroup::Administrative),
    ("marketing", ExpenseGroup::Administrative),
    ("personnel", ExpenseGroup::Administrative),
    ("admin_other", ExpenseGroup::Administrative),
    ("interest", ExpenseGroup::Financial),
    ("fees", ExpenseGroup::Financial),
    ("financial_management", ExpenseGroup::Financial),
    ("financial_other", ExpenseGroup::Financial),
];

pub const REVENUE_CATEGORIES: &[&str] = &[
    "cattle_sales",
    "byproduct_sales",
    "service_revenue",
    "financial_income",
    "other_revenue",
];

/// Categorias que não movimentam caixa (perdas contábeis).
pub const NON_CASH_EXPENSE_CATEGORIES: &[&str] = &["deaths", "weight_loss"];

pub const CATEGORY_ANIMAL_PURCHASE: &str = "animal_purchase";
pub const CATEGORY_FREIGHT: &str = "freight";
pub const CATEGORY_COMMISSION: &str = "commission";
pub const CATEGORY_DEATHS: &str = "deaths";
pub const CATEGORY_HEALTH_COSTS: &str = "health_costs";
pub const CATEGORY_CATTLE_SALES: &str = "cattle_sales";

/// Despesas que a própria compra de gado gera e regenera.
pub const PURCHASE_GENERATED_CATEGORIES: &[&str] =
    &[CATEGORY_ANIMAL_PURCHASE, CATEGORY_FREIGHT, CATEGORY_COMMISSION];

pub fn expense_group(category: &str) -> Option<ExpenseGroup> {
    EXPENSE_CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, group)| *group)
}

pub fn is_revenue_category(category: &str) -> bool {
    REVENUE_CATEGORIES.contains(&category)
}

pub fn impacts_cash_flow_by_default(category: &str) -> bool {
    !NON_CASH_EXPENSE_CATEGORIES.contains(&category)
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayerAccount {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "Conta Principal")]
    pub name: String,

    #[schema(example = "Banco do Brasil")]
    pub bank_name: Option<String>,
    pub agency: Option<String>,
    pub account_number: Option<String>,

    #[schema(example = "1500.50")]
    pub balance: Decimal,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,

    #[schema(example = "feed")]
    pub category: String,

    #[schema(example = "Ração - Março")]
    pub description: String,

    #[schema(example = "12500.00")]
    pub total_amount: Decimal,

    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub is_paid: bool,
    pub impacts_cash_flow: bool,

    // Vínculos
    pub purchase_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub payer_account_id: Option<Uuid>,

    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    pub id: Uuid,

    #[schema(example = "cattle_sales")]
    pub category: String,

    #[schema(example = "Venda lote LOT-2503001")]
    pub description: String,

    #[schema(example = "98000.00")]
    pub total_amount: Decimal,

    pub due_date: NaiveDate,
    pub receipt_date: Option<NaiveDate>,
    pub is_received: bool,

    pub sale_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub payer_account_id: Option<Uuid>,

    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Campos de uma despesa a ser gravada.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub category: String,
    pub description: String,
    pub total_amount: Decimal,
    pub due_date: NaiveDate,
    pub impacts_cash_flow: bool,
    pub purchase_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub payer_account_id: Option<Uuid>,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Campos de uma receita a ser gravada.
#[derive(Debug, Clone)]
pub struct NewRevenue {
    pub category: String,
    pub description: String,
    pub total_amount: Decimal,
    pub due_date: NaiveDate,
    pub sale_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub payer_account_id: Option<Uuid>,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct FinanceFilter {
    pub category: Option<String>,
    pub settled: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// --- Agregados ---

/// Totais de caixa de um período (realizado e previsto).
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow)]
pub struct CashTotals {
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub pending_inflow: Decimal,
    pub pending_outflow: Decimal,
}

/// Entradas e saídas realizadas em um mês (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct MonthlyCash {
    pub month: String,
    pub inflow: Decimal,
    pub outflow: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashFlowTrend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowPeriod {
    #[schema(example = "2025-03")]
    pub month: String,
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowSnapshot {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub inflow: Decimal,
    pub outflow: Decimal,
    /// Sempre `inflow - outflow`
    pub balance: Decimal,
    pub pending_inflow: Decimal,
    pub pending_outflow: Decimal,
    pub previous_balance: Decimal,
    pub trend: CashFlowTrend,
    pub periods: Vec<CashFlowPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAmount {
    pub category: String,
    pub amount: Decimal,
}

/// Demonstração de Resultado do Exercício
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DreStatement {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub revenues: Vec<CategoryAmount>,
    pub gross_revenue: Decimal,
    pub acquisition_costs: Decimal,
    pub gross_profit: Decimal,
    pub operational_expenses: Decimal,
    pub administrative_expenses: Decimal,
    pub financial_expenses: Decimal,
    pub operating_result: Decimal,
    pub net_result: Decimal,
    /// Percentual sobre a receita bruta
    pub net_margin: Decimal,
}

// src/models/intervention.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "intervention_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterventionType {
    Vaccine,
    Medication,
    Treatment,
}

impl InterventionType {
    pub fn label(self) -> &'static str {
        match self {
            InterventionType::Vaccine => "Vacina",
            InterventionType::Medication => "Medicamento",
            InterventionType::Treatment => "Tratamento",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthIntervention {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub pen_id: Option<Uuid>,
    pub intervention_type: InterventionType,

    #[schema(example = "Vacina contra febre aftosa")]
    pub product_name: String,
    #[schema(example = "5.000")]
    pub dose: Decimal,
    #[schema(example = "ml")]
    pub unit: String,
    pub application_date: NaiveDate,
    pub veterinarian: Option<String>,
    pub batch_number: Option<String>,

    #[schema(example = "850.00")]
    pub cost: Decimal,
    /// Despesa `health_costs` gerada pelo custo
    pub expense_id: Option<Uuid>,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIntervention {
    pub lot_id: Uuid,
    pub pen_id: Option<Uuid>,
    pub intervention_type: InterventionType,
    pub product_name: String,
    pub dose: Decimal,
    pub unit: String,
    pub application_date: NaiveDate,
    pub veterinarian: Option<String>,
    pub batch_number: Option<String>,
    pub cost: Decimal,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InterventionFilter {
    pub lot_id: Option<Uuid>,
    pub pen_id: Option<Uuid>,
    pub intervention_type: Option<InterventionType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Tipo de evento na linha do tempo sanitária.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryKind {
    Health,
    Mortality,
    Movement,
    Weighing,
}

impl HistoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryKind::Health => "HEALTH",
            HistoryKind::Mortality => "MORTALITY",
            HistoryKind::Movement => "MOVEMENT",
            HistoryKind::Weighing => "WEIGHING",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryFilter {
    pub lot_id: Option<Uuid>,
    pub pen_id: Option<Uuid>,
    pub kind: Option<HistoryKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Um evento da linha do tempo: intervenção, morte, movimentação ou pesagem.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// `HEALTH`, `MORTALITY`, `MOVEMENT` ou `WEIGHING`
    #[schema(example = "HEALTH")]
    pub kind: String,
    pub id: Uuid,
    pub lot_id: Uuid,
    pub pen_id: Option<Uuid>,
    pub event_date: NaiveDate,
    /// Cabeças envolvidas (amostra, no caso de pesagens)
    pub quantity: Option<i32>,
    #[schema(example = "VACCINE - Vacina contra febre aftosa")]
    pub description: String,
    pub cost: Option<Decimal>,
}

/// Agregados das intervenções sanitárias no recorte pedido.
#[derive(Debug, Clone, Default, FromRow)]
pub struct HealthTotals {
    pub total: i64,
    pub vaccines: i64,
    pub medications: i64,
    pub treatments: i64,
    pub total_cost: Decimal,
}

/// Contagem dos demais eventos no mesmo recorte.
#[derive(Debug, Clone, Default, FromRow)]
pub struct ActivityTotals {
    pub mortality_events: i64,
    pub total_deaths: i64,
    pub movements: i64,
    pub weighings: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterventionStats {
    pub health_interventions: i64,
    pub vaccines: i64,
    pub medications: i64,
    pub treatments: i64,
    pub health_cost: Decimal,
    pub average_cost: Decimal,
    pub mortality_events: i64,
    pub total_deaths: i64,
    pub movements: i64,
    pub weighings: i64,
}

/// Mortes agrupadas por causa (sem diferenciar maiúsculas).
#[derive(Debug, Clone, FromRow)]
pub struct CauseTotals {
    pub cause: String,
    pub events: i64,
    pub deaths: i64,
    /// Custo de aquisição por cabeça vezes as mortes
    pub estimated_loss: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MortalityCause {
    #[schema(example = "Pneumonia")]
    pub cause: String,
    pub events: i64,
    pub deaths: i64,
    /// Percentual das mortes do período
    pub share: Decimal,
    pub average_per_event: Decimal,
    pub estimated_loss: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MortalityAnalysis {
    pub total_events: i64,
    pub total_deaths: i64,
    pub estimated_loss: Decimal,
    /// Da causa com mais mortes para a com menos
    pub causes: Vec<MortalityCause>,
}

// src/services/intervention_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::{AppError, BusinessRule, Resource},
        pagination::{Paginated, PaginationParams},
    },
    db::{FinanceRepository, InterventionRepository, LotRepository, PenRepository},
    models::{
        finance::{NewExpense, CATEGORY_HEALTH_COSTS},
        intervention::{
            ActivityTotals, CauseTotals, HealthIntervention, HealthTotals, HistoryEntry, HistoryFilter,
            InterventionFilter, InterventionStats, MortalityAnalysis, MortalityCause, NewIntervention,
        },
        lot::LotStatus,
    },
    services::finance_service::ensure_business_dates,
};

#[derive(Clone)]
pub struct InterventionService {
    repo: InterventionRepository,
    lot_repo: LotRepository,
    pen_repo: PenRepository,
    finance_repo: FinanceRepository,
    pool: PgPool,
}

impl InterventionService {
    pub fn new(
        repo: InterventionRepository,
        lot_repo: LotRepository,
        pen_repo: PenRepository,
        finance_repo: FinanceRepository,
        pool: PgPool,
    ) -> Self {
        Self { repo, lot_repo, pen_repo, finance_repo, pool }
    }

    pub async fn list(
        &self,
        filter: &InterventionFilter,
        paging: &PaginationParams,
    ) -> Result<Paginated<HealthIntervention>, AppError> {
        let items = self.repo
            .list(&self.pool, filter, paging.limit(), paging.offset())
            .await?;
        let total = self.repo.count(&self.pool, filter).await?;
        Ok(Paginated::new(items, total, paging))
    }

    pub async fn get(&self, id: Uuid) -> Result<HealthIntervention, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Intervention))
    }

    /// Registra a intervenção e, havendo custo, a despesa `health_costs` do lote.
    pub async fn create(&self, data: NewIntervention) -> Result<HealthIntervention, AppError> {
        let mut tx = self.pool.begin().await?;

        let lot = self.lot_repo
            .find_by_id(&mut *tx, data.lot_id)
            .await?
            .ok_or(AppError::InvalidReference("lotId"))?;
        if lot.status != LotStatus::Active {
            return Err(BusinessRule::LotNotActive.into());
        }

        if let Some(pen_id) = data.pen_id {
            self.pen_repo
                .find_by_id(&mut *tx, pen_id)
                .await?
                .ok_or(AppError::InvalidReference("penId"))?;
        }

        let expense_id = if data.cost > Decimal::ZERO {
            let expense = self.finance_repo
                .create_expense(
                    &mut *tx,
                    &NewExpense {
                        category: CATEGORY_HEALTH_COSTS.to_string(),
                        description: format!(
                            "{} - {} ({})",
                            data.intervention_type.label(),
                            data.product_name,
                            lot.name
                        ),
                        total_amount: data.cost,
                        due_date: data.application_date,
                        impacts_cash_flow: true,
                        purchase_id: lot.purchase_id,
                        lot_id: Some(lot.id),
                        vendor_id: None,
                        payer_account_id: None,
                        notes: data.notes.clone(),
                        user_id: data.user_id,
                    },
                )
                .await?;
            Some(expense.id)
        } else {
            None
        };

        let intervention = self.repo.create(&mut *tx, &data, expense_id).await?;
        tx.commit().await?;

        tracing::info!(
            intervention_id = %intervention.id,
            lot_id = %intervention.lot_id,
            kind = ?intervention.intervention_type,
            cost = %intervention.cost,
            "Intervenção sanitária registrada"
        );
        Ok(intervention)
    }

    /// Remove a intervenção junto com a despesa ainda não paga.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let intervention = self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Intervention))?;

        if let Some(expense_id) = intervention.expense_id {
            let expense = self.finance_repo.find_expense_for_update(&mut *tx, expense_id).await?;
            if expense.is_some_and(|e| e.is_paid) {
                return Err(BusinessRule::SettledRecordLocked.into());
            }
        }

        self.repo.delete(&mut *tx, id).await?;
        if let Some(expense_id) = intervention.expense_id {
            self.finance_repo.delete_expense(&mut *tx, expense_id).await?;
        }
        tx.commit().await?;

        tracing::info!(intervention_id = %id, "Intervenção sanitária removida");
        Ok(())
    }

    pub async fn history(
        &self,
        filter: &HistoryFilter,
        paging: &PaginationParams,
    ) -> Result<Paginated<HistoryEntry>, AppError> {
        ensure_business_dates(&[filter.start_date, filter.end_date])?;

        let items = self.repo
            .history(&self.pool, filter, paging.limit(), paging.offset())
            .await?;
        let total = self.repo.count_history(&self.pool, filter).await?;
        Ok(Paginated::new(items, total, paging))
    }

    pub async fn stats(
        &self,
        lot_id: Option<Uuid>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<InterventionStats, AppError> {
        ensure_business_dates(&[start, end])?;

        let health = self.repo.health_totals(&self.pool, lot_id, start, end).await?;
        let activity = self.repo.activity_totals(&self.pool, lot_id, start, end).await?;
        Ok(build_stats(&health, &activity))
    }

    pub async fn mortality_analysis(
        &self,
        lot_id: Option<Uuid>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<MortalityAnalysis, AppError> {
        ensure_business_dates(&[start, end])?;

        let rows = self.repo.mortality_by_cause(&self.pool, lot_id, start, end).await?;
        Ok(build_mortality_analysis(rows))
    }
}

pub(crate) fn build_stats(health: &HealthTotals, activity: &ActivityTotals) -> InterventionStats {
    let average_cost = if health.total > 0 {
        (health.total_cost / Decimal::from(health.total)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    InterventionStats {
        health_interventions: health.total,
        vaccines: health.vaccines,
        medications: health.medications,
        treatments: health.treatments,
        health_cost: health.total_cost,
        average_cost,
        mortality_events: activity.mortality_events,
        total_deaths: activity.total_deaths,
        movements: activity.movements,
        weighings: activity.weighings,
    }
}

/// Participação de cada causa nas mortes e média de cabeças por ocorrência.
pub(crate) fn build_mortality_analysis(mut rows: Vec<CauseTotals>) -> MortalityAnalysis {
    rows.sort_by(|a, b| b.deaths.cmp(&a.deaths).then_with(|| a.cause.cmp(&b.cause)));

    let total_events: i64 = rows.iter().map(|r| r.events).sum();
    let total_deaths: i64 = rows.iter().map(|r| r.deaths).sum();
    let estimated_loss: Decimal = rows.iter().map(|r| r.estimated_loss).sum();

    let causes = rows
        .into_iter()
        .map(|row| {
            let share = if total_deaths > 0 {
                (Decimal::from(row.deaths) * Decimal::ONE_HUNDRED / Decimal::from(total_deaths)).round_dp(2)
            } else {
                Decimal::ZERO
            };
            let average_per_event = if row.events > 0 {
                (Decimal::from(row.deaths) / Decimal::from(row.events)).round_dp(2)
            } else {
                Decimal::ZERO
            };
            MortalityCause {
                cause: row.cause,
                events: row.events,
                deaths: row.deaths,
                share,
                average_per_event,
                estimated_loss: row.estimated_loss,
            }
        })
        .collect();

    MortalityAnalysis { total_events, total_deaths, estimated_loss, causes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cause(name: &str, events: i64, deaths: i64, loss: Decimal) -> CauseTotals {
        CauseTotals { cause: name.to_string(), events, deaths, estimated_loss: loss }
    }

    #[test]
    fn causes_are_ranked_by_deaths_with_their_share() {
        let analysis = build_mortality_analysis(vec![
            cause("Acidente", 1, 1, dec!(3200.00)),
            cause("Pneumonia", 2, 3, dec!(9600.00)),
        ]);

        assert_eq!(analysis.total_events, 3);
        assert_eq!(analysis.total_deaths, 4);
        assert_eq!(analysis.estimated_loss, dec!(12800.00));
        assert_eq!(analysis.causes[0].cause, "Pneumonia");
        assert_eq!(analysis.causes[0].share, dec!(75.00));
        assert_eq!(analysis.causes[0].average_per_event, dec!(1.50));
        assert_eq!(analysis.causes[1].share, dec!(25.00));
    }

    #[test]
    fn no_deaths_means_an_empty_analysis() {
        let analysis = build_mortality_analysis(vec![]);
        assert_eq!(analysis.total_deaths, 0);
        assert_eq!(analysis.estimated_loss, Decimal::ZERO);
        assert!(analysis.causes.is_empty());
    }

    #[test]
    fn average_cost_ignores_empty_periods() {
        let stats = build_stats(&HealthTotals::default(), &ActivityTotals::default());
        assert_eq!(stats.average_cost, Decimal::ZERO);

        let health = HealthTotals {
            total: 3,
            vaccines: 2,
            medications: 1,
            treatments: 0,
            total_cost: dec!(1000.00),
        };
        let stats = build_stats(&health, &ActivityTotals::default());
        assert_eq!(stats.average_cost, dec!(333.33));
        assert_eq!(stats.vaccines, 2);
    }
}

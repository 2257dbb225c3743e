// src/services/lot_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::{AppError, BusinessRule, Resource},
        pagination::{Paginated, PaginationParams},
        validation::ensure_amount,
    },
    db::{CattlePurchaseRepository, FinanceRepository, LotRepository, PenRepository},
    models::{
        finance::{NewExpense, CATEGORY_DEATHS},
        lot::{
            Lot, LotData, LotFilter, LotMovement, LotPerformance, LotStatus, MortalityRecord, MovementType,
            NewMovement, WeightRecord,
        },
    },
    services::pen_service::{check_allocation, shrink_lot_allocations, sync_pen_status},
};

#[derive(Clone)]
pub struct LotService {
    repo: LotRepository,
    pen_repo: PenRepository,
    purchase_repo: CattlePurchaseRepository,
    finance_repo: FinanceRepository,
    pool: PgPool,
}

impl LotService {
    pub fn new(
        repo: LotRepository,
        pen_repo: PenRepository,
        purchase_repo: CattlePurchaseRepository,
        finance_repo: FinanceRepository,
        pool: PgPool,
    ) -> Self {
        Self { repo, pen_repo, purchase_repo, finance_repo, pool }
    }

    pub async fn list(&self, filter: &LotFilter, paging: &PaginationParams) -> Result<Paginated<Lot>, AppError> {
        let items = self.repo
            .list(&self.pool, filter, paging.limit(), paging.offset())
            .await?;
        let total = self.repo.count(&self.pool, filter).await?;
        Ok(Paginated::new(items, total, paging))
    }

    pub async fn get(&self, id: Uuid) -> Result<Lot, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Lot))
    }

    pub async fn create(&self, data: LotData) -> Result<Lot, AppError> {
        if let Some(purchase_id) = data.purchase_id {
            self.purchase_repo
                .find_by_id(&self.pool, purchase_id)
                .await?
                .ok_or(AppError::InvalidReference("purchaseId"))?;
        }

        let lot = self.repo.create(&self.pool, &data).await?;
        tracing::info!(lot_id = %lot.id, name = %lot.name, animals = lot.expected_animals, "Lote criado");
        Ok(lot)
    }

    /// Mudar `expectedAnimals` desloca `currentQuantity` na mesma medida, preservando as baixas.
    pub async fn update(&self, id: Uuid, data: LotData, status: Option<LotStatus>) -> Result<Lot, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Lot))?;
        let quantity = adjusted_quantity(current.expected_animals, current.current_quantity, data.expected_animals)?;

        let lot = self.repo
            .update(&mut *tx, id, &data, quantity, status.unwrap_or(current.status))
            .await?
            .ok_or(AppError::NotFound(Resource::Lot))?;
        if quantity < current.current_quantity {
            shrink_lot_allocations(&self.pen_repo, &self.repo, &mut tx, id, quantity).await?;
        }

        tx.commit().await?;
        Ok(lot)
    }

    /// Lotes ainda alocados em currais ou com vendas não podem ser removidos (409).
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Lot))?;

        if self.repo.allocated_quantity(&mut *tx, id).await? > 0 {
            return Err(AppError::ResourceInUse(Resource::Lot));
        }

        self.repo.delete(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    // ---
    // Pesagens
    // ---

    pub async fn add_weight(
        &self,
        lot_id: Uuid,
        weighing_date: NaiveDate,
        average_weight: Decimal,
        sample_size: i32,
        notes: Option<&str>,
    ) -> Result<WeightRecord, AppError> {
        self.get(lot_id).await?;
        self.repo
            .create_weight_record(&self.pool, lot_id, weighing_date, average_weight, sample_size, notes)
            .await
    }

    pub async fn weights(&self, lot_id: Uuid) -> Result<Vec<WeightRecord>, AppError> {
        self.get(lot_id).await?;
        self.repo.list_weight_records(&self.pool, lot_id).await
    }

    // ---
    // Mortalidade
    // ---

    /// Baixa animais mortos: registro, movimentação, alocações e despesa não-caixa.
    pub async fn add_mortality(
        &self,
        lot_id: Uuid,
        record_date: NaiveDate,
        quantity: i32,
        cause: &str,
        notes: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<MortalityRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let lot = self.repo
            .find_by_id_for_update(&mut *tx, lot_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Lot))?;

        if quantity > lot.current_quantity {
            return Err(BusinessRule::InsufficientAnimals {
                available: lot.current_quantity as i64,
                requested: quantity as i64,
            }
            .into());
        }

        let record = self.repo
            .create_mortality_record(&mut *tx, lot_id, record_date, quantity, cause, notes)
            .await?;

        let remaining = lot.current_quantity - quantity;
        self.repo.set_quantity(&mut *tx, lot_id, remaining, lot.status).await?;
        self.repo
            .create_movement(
                &mut *tx,
                &NewMovement {
                    lot_id,
                    movement_type: MovementType::Death,
                    from_pen_id: lot.pen_id,
                    to_pen_id: None,
                    quantity,
                    reason: Some(cause.to_string()),
                    user_id,
                },
            )
            .await?;
        shrink_lot_allocations(&self.pen_repo, &self.repo, &mut tx, lot_id, remaining).await?;

        // Perda contábil pelo custo de aquisição por cabeça
        if let Some(cost_per_head) = self.repo.cost_per_head(&mut *tx, lot_id).await? {
            self.finance_repo
                .create_expense(
                    &mut *tx,
                    &NewExpense {
                        category: CATEGORY_DEATHS.to_string(),
                        description: format!("Mortalidade - {} ({} cab.)", lot.name, quantity),
                        total_amount: ensure_amount(cost_per_head.checked_mul(Decimal::from(quantity)))?,
                        due_date: record_date,
                        impacts_cash_flow: false,
                        purchase_id: lot.purchase_id,
                        lot_id: Some(lot_id),
                        vendor_id: None,
                        payer_account_id: None,
                        notes: Some(cause.to_string()),
                        user_id,
                    },
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(lot_id = %lot_id, quantity, cause, "Mortalidade registrada");
        Ok(record)
    }

    pub async fn mortalities(&self, lot_id: Uuid) -> Result<Vec<MortalityRecord>, AppError> {
        self.get(lot_id).await?;
        self.repo.list_mortality_records(&self.pool, lot_id).await
    }

    // ---
    // Movimentações
    // ---

    pub async fn movements(&self, lot_id: Uuid) -> Result<Vec<LotMovement>, AppError> {
        self.get(lot_id).await?;
        self.repo.list_movements(&self.pool, lot_id).await
    }

    /// Move cabeças de um curral para outro, checando a capacidade do destino.
    pub async fn transfer(
        &self,
        lot_id: Uuid,
        from_pen_id: Uuid,
        to_pen_id: Uuid,
        quantity: i32,
        reason: Option<String>,
        user_id: Option<Uuid>,
    ) -> Result<LotMovement, AppError> {
        if from_pen_id == to_pen_id {
            return Err(BusinessRule::SamePen.into());
        }

        let mut tx = self.pool.begin().await?;

        // Lote primeiro, depois os dois currais sempre na mesma ordem
        self.repo
            .find_by_id_for_update(&mut *tx, lot_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Lot))?;

        let (first, second) = if from_pen_id < to_pen_id { (from_pen_id, to_pen_id) } else { (to_pen_id, from_pen_id) };
        for pen_id in [first, second] {
            self.pen_repo
                .find_by_id_for_update(&mut *tx, pen_id)
                .await?
                .ok_or(AppError::NotFound(Resource::Pen))?;
        }
        let destination = self.pen_repo
            .find_by_id(&mut *tx, to_pen_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Pen))?;

        let in_source = self.pen_repo.lot_quantity_in_pen(&mut *tx, from_pen_id, lot_id).await?;
        let occupied = self.pen_repo.occupied(&mut *tx, to_pen_id).await?;
        check_allocation(&destination, occupied, quantity as i64, in_source)?;

        // Origem: libera tudo e recria o que sobrou
        self.pen_repo.release_lot_in_pen(&mut *tx, from_pen_id, lot_id).await?;
        let left_behind = in_source - quantity as i64;
        if left_behind > 0 {
            self.pen_repo
                .create_allocation(&mut *tx, from_pen_id, lot_id, left_behind as i32)
                .await?;
        }
        self.pen_repo.create_allocation(&mut *tx, to_pen_id, lot_id, quantity).await?;
        self.repo.set_pen(&mut *tx, lot_id, Some(to_pen_id)).await?;

        let movement = self.repo
            .create_movement(
                &mut *tx,
                &NewMovement {
                    lot_id,
                    movement_type: MovementType::Transfer,
                    from_pen_id: Some(from_pen_id),
                    to_pen_id: Some(to_pen_id),
                    quantity,
                    reason,
                    user_id,
                },
            )
            .await?;

        sync_pen_status(&self.pen_repo, &mut tx, from_pen_id).await?;
        sync_pen_status(&self.pen_repo, &mut tx, to_pen_id).await?;

        tx.commit().await?;

        tracing::info!(lot_id = %lot_id, from = %from_pen_id, to = %to_pen_id, quantity, "Transferência de curral");
        Ok(movement)
    }

    // ---
    // Desempenho
    // ---

    pub async fn performance(&self, lot_id: Uuid) -> Result<LotPerformance, AppError> {
        let lot = self.get(lot_id).await?;
        let weights = self.repo.list_weight_records(&self.pool, lot_id).await?;
        let mortalities = self.repo.list_mortality_records(&self.pool, lot_id).await?;

        let total_deaths: i64 = mortalities.iter().map(|m| m.quantity as i64).sum();
        let latest_weight = weights.first().map(|w| w.average_weight);

        Ok(compute_performance(
            &lot,
            latest_weight,
            weights.len() as i64,
            total_deaths,
            Utc::now().date_naive(),
        ))
    }
}

/// Dias desde a entrada no confinamento (nunca negativo).
/// Nova quantidade atual quando a previsão de animais muda.
///
/// As baixas já registradas (`expected - current`) não podem superar a nova previsão.
pub(crate) fn adjusted_quantity(expected: i32, current: i32, new_expected: i32) -> Result<i32, AppError> {
    let lost = (expected - current).max(0);
    if new_expected < lost {
        return Err(BusinessRule::ExpectedBelowLost { lost }.into());
    }
    Ok(new_expected - lost)
}

pub fn days_on_feed(entry_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - entry_date).num_days().max(0)
}

/// GMD em kg/cabeça/dia. Zero quando ainda não há dias de cocho.
pub fn average_daily_gain(initial_weight: Decimal, current_weight: Decimal, days: i64) -> Decimal {
    if days <= 0 {
        return Decimal::ZERO;
    }
    ((current_weight - initial_weight) / Decimal::from(days)).round_dp(3)
}

pub fn mortality_rate(deaths: i64, expected_animals: i64) -> Decimal {
    if expected_animals <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(deaths) / Decimal::from(expected_animals) * Decimal::ONE_HUNDRED).round_dp(2)
}

pub fn compute_performance(
    lot: &Lot,
    latest_weight: Option<Decimal>,
    weighings_count: i64,
    total_deaths: i64,
    today: NaiveDate,
) -> LotPerformance {
    let current_average_weight = latest_weight.unwrap_or(lot.initial_weight);
    let days = days_on_feed(lot.entry_date, today);

    LotPerformance {
        lot_id: lot.id,
        initial_weight: lot.initial_weight,
        current_average_weight,
        total_gain: current_average_weight - lot.initial_weight,
        days_on_feed: days,
        average_daily_gain: average_daily_gain(lot.initial_weight, current_average_weight, days),
        total_deaths,
        mortality_rate: mortality_rate(total_deaths, lot.expected_animals as i64),
        weighings_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot() -> Lot {
        Lot {
            id: Uuid::new_v4(),
            name: "Lote Nelore 01".into(),
            description: None,
            purchase_id: None,
            pen_id: None,
            initial_weight: dec!(360),
            expected_animals: 200,
            current_quantity: 196,
            entry_date: date(2025, 1, 1),
            status: LotStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn performance_uses_the_latest_weighing() {
        let lot = lot();
        let perf = compute_performance(&lot, Some(dec!(450)), 3, 4, date(2025, 3, 2));

        assert_eq!(perf.days_on_feed, 60);
        assert_eq!(perf.total_gain, dec!(90));
        assert_eq!(perf.average_daily_gain, dec!(1.5));
        assert_eq!(perf.mortality_rate, dec!(2));
        assert_eq!(perf.weighings_count, 3);
    }

    #[test]
    fn lot_without_weighings_has_no_gain() {
        let lot = lot();
        let perf = compute_performance(&lot, None, 0, 0, date(2025, 2, 1));

        assert_eq!(perf.current_average_weight, dec!(360));
        assert_eq!(perf.total_gain, Decimal::ZERO);
        assert_eq!(perf.average_daily_gain, Decimal::ZERO);
    }

    #[test]
    fn changing_expected_animals_shifts_the_current_quantity() {
        // 100 previstos, 3 mortes
        assert_eq!(adjusted_quantity(100, 97, 120).unwrap(), 117);
        assert_eq!(adjusted_quantity(100, 97, 90).unwrap(), 87);
        assert_eq!(adjusted_quantity(100, 97, 3).unwrap(), 0);
        assert!(matches!(
            adjusted_quantity(100, 97, 2),
            Err(AppError::BusinessRule(BusinessRule::ExpectedBelowLost { lost: 3 }))
        ));
    }

    #[test]
    fn daily_gain_is_zero_on_entry_day() {
        assert_eq!(average_daily_gain(dec!(300), dec!(310), 0), Decimal::ZERO);
        assert_eq!(days_on_feed(date(2025, 5, 10), date(2025, 5, 1)), 0);
    }
}

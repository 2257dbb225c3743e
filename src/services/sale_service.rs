// src/services/sale_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{code_period_prefix, lock_code_sequence, next_sequential_code},
        error::{AppError, BusinessRule, Resource},
        pagination::{Paginated, PaginationParams},
        validation::ensure_amount,
    },
    db::{FinanceRepository, LotRepository, PenRepository, SaleRepository},
    models::{
        finance::{NewRevenue, CATEGORY_CATTLE_SALES},
        lot::LotStatus,
        sale::{PipelineStage, SaleData, SaleFilter, SaleRecord, SaleStatus},
    },
    services::pen_service::shrink_lot_allocations,
};

const SALE_NUMBER_PREFIX: &str = "VND";

#[derive(Clone)]
pub struct SaleService {
    repo: SaleRepository,
    lot_repo: LotRepository,
    pen_repo: PenRepository,
    finance_repo: FinanceRepository,
    pool: PgPool,
}

impl SaleService {
    pub fn new(
        repo: SaleRepository,
        lot_repo: LotRepository,
        pen_repo: PenRepository,
        finance_repo: FinanceRepository,
        pool: PgPool,
    ) -> Self {
        Self { repo, lot_repo, pen_repo, finance_repo, pool }
    }

    pub async fn list(&self, filter: &SaleFilter, paging: &PaginationParams) -> Result<Paginated<SaleRecord>, AppError> {
        let items = self.repo
            .list(&self.pool, filter, paging.limit(), paging.offset())
            .await?;
        let total = self.repo.count(&self.pool, filter).await?;
        Ok(Paginated::new(items, total, paging))
    }

    pub async fn get(&self, id: Uuid) -> Result<SaleRecord, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Sale))
    }

    pub async fn create(&self, data: SaleData) -> Result<SaleRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let lot = self.lot_repo
            .find_by_id(&mut *tx, data.lot_id)
            .await?
            .ok_or(AppError::InvalidReference("lotId"))?;
        ensure_quantity(lot.current_quantity, data.quantity)?;

        let period_prefix = code_period_prefix(SALE_NUMBER_PREFIX, data.sale_date);
        lock_code_sequence(&mut tx, &period_prefix).await?;
        let last_number = self.repo.last_sale_number(&mut *tx, &period_prefix).await?;
        let sale_number = next_sequential_code(SALE_NUMBER_PREFIX, data.sale_date, last_number.as_deref());

        let total = sale_total(data.total_weight, data.price_per_kg)?;
        let sale = self.repo.create(&mut *tx, &sale_number, &data, total).await?;

        tx.commit().await?;

        tracing::info!(sale_id = %sale.id, sale_number = %sale.sale_number, amount = %sale.total_amount, "Venda registrada");
        Ok(sale)
    }

    pub async fn update(&self, id: Uuid, data: SaleData) -> Result<SaleRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Sale))?;
        if current.status == SaleStatus::Completed {
            return Err(BusinessRule::CompletedSaleLocked.into());
        }

        let lot = self.lot_repo
            .find_by_id(&mut *tx, data.lot_id)
            .await?
            .ok_or(AppError::InvalidReference("lotId"))?;
        ensure_quantity(lot.current_quantity, data.quantity)?;

        let total = sale_total(data.total_weight, data.price_per_kg)?;
        let sale = self.repo
            .update(&mut *tx, id, &data, total)
            .await?
            .ok_or(AppError::NotFound(Resource::Sale))?;

        tx.commit().await?;
        Ok(sale)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let sale = self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Sale))?;
        if sale.status == SaleStatus::Completed {
            return Err(BusinessRule::CompletedSaleLocked.into());
        }

        self.repo.delete(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Avança a venda no pipeline. A conclusão baixa os animais do lote e lança a receita.
    pub async fn update_status(&self, id: Uuid, next: SaleStatus, user_id: Option<Uuid>) -> Result<SaleRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let sale = self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Sale))?;
        ensure_transition(sale.status, next)?;

        if next == SaleStatus::Completed {
            let lot = self.lot_repo
                .find_by_id_for_update(&mut *tx, sale.lot_id)
                .await?
                .ok_or(AppError::InvalidReference("lotId"))?;
            ensure_quantity(lot.current_quantity, sale.quantity)?;

            let remaining = lot.current_quantity - sale.quantity;
            let status = if remaining == 0 { LotStatus::Sold } else { lot.status };
            self.lot_repo.set_quantity(&mut *tx, lot.id, remaining, status).await?;
            shrink_lot_allocations(&self.pen_repo, &self.lot_repo, &mut tx, lot.id, remaining).await?;

            self.finance_repo
                .create_revenue(
                    &mut *tx,
                    &NewRevenue {
                        category: CATEGORY_CATTLE_SALES.to_string(),
                        description: format!("Venda {} - {} ({} cab.)", sale.sale_number, lot.name, sale.quantity),
                        total_amount: sale.total_amount,
                        due_date: sale.payment_due_date.unwrap_or(sale.sale_date),
                        sale_id: Some(sale.id),
                        buyer_id: Some(sale.buyer_id),
                        payer_account_id: None,
                        notes: sale.notes.clone(),
                        user_id,
                    },
                )
                .await?;
        }

        let updated = self.repo.set_status(&mut *tx, id, next).await?;
        tx.commit().await?;

        tracing::info!(
            sale_id = %id,
            from = sale.status.as_str(),
            to = next.as_str(),
            "Status da venda alterado"
        );
        Ok(updated)
    }

    pub async fn pipeline(&self) -> Result<Vec<PipelineStage>, AppError> {
        self.repo.pipeline(&self.pool).await
    }
}

pub fn sale_total(total_weight: Decimal, price_per_kg: Decimal) -> Result<Decimal, AppError> {
    ensure_amount(total_weight.checked_mul(price_per_kg).map(|total| total.round_dp(2)))
}

fn ensure_quantity(available: i32, requested: i32) -> Result<(), AppError> {
    if requested > available {
        return Err(BusinessRule::InsufficientAnimals {
            available: available as i64,
            requested: requested as i64,
        }
        .into());
    }
    Ok(())
}

fn ensure_transition(from: SaleStatus, to: SaleStatus) -> Result<(), AppError> {
    if !from.can_transition_to(to) {
        return Err(BusinessRule::InvalidStatusTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_is_weight_times_price() {
        assert_eq!(sale_total(dec!(18500), dec!(11.2)).unwrap(), dec!(207200));
        assert_eq!(sale_total(dec!(1000.5), dec!(10.333)).unwrap(), dec!(10338.17));
    }

    #[test]
    fn total_that_overflows_is_rejected() {
        assert!(matches!(
            sale_total(dec!(70000000000000000000000000000), dec!(2)),
            Err(AppError::BusinessRule(BusinessRule::AmountOutOfRange))
        ));
        assert!(sale_total(dec!(9999999999999), dec!(99999999999)).is_err());
    }

    #[test]
    fn cannot_sell_more_than_the_lot_has() {
        assert!(ensure_quantity(100, 100).is_ok());
        assert!(matches!(
            ensure_quantity(10, 11),
            Err(AppError::BusinessRule(BusinessRule::InsufficientAnimals { available: 10, requested: 11 }))
        ));
    }

    #[test]
    fn skipping_pipeline_stages_is_rejected() {
        assert!(ensure_transition(SaleStatus::Pending, SaleStatus::Confirmed).is_ok());
        assert!(matches!(
            ensure_transition(SaleStatus::Pending, SaleStatus::Completed),
            Err(AppError::BusinessRule(BusinessRule::InvalidStatusTransition { .. }))
        ));
    }
}

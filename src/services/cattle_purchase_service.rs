// src/services/cattle_purchase_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{code_period_prefix, lock_code_sequence, next_sequential_code},
        error::{AppError, BusinessRule, Resource},
        pagination::{Paginated, PaginationParams},
        validation::ensure_amount,
    },
    db::{CattlePurchaseRepository, FinanceRepository},
    models::{
        cattle_purchase::{
            CattlePurchase, PurchaseFilter, PurchaseInput, PurchaseStatus, PurchaseTotals, Reception,
            KG_PER_ARROBA,
        },
        finance::{NewExpense, CATEGORY_ANIMAL_PURCHASE, CATEGORY_COMMISSION, CATEGORY_FREIGHT},
    },
};

const LOT_CODE_PREFIX: &str = "LOT";

#[derive(Clone)]
pub struct CattlePurchaseService {
    repo: CattlePurchaseRepository,
    finance_repo: FinanceRepository,
    pool: PgPool,
}

impl CattlePurchaseService {
    pub fn new(repo: CattlePurchaseRepository, finance_repo: FinanceRepository, pool: PgPool) -> Self {
        Self { repo, finance_repo, pool }
    }

    pub async fn list(
        &self,
        filter: &PurchaseFilter,
        paging: &PaginationParams,
    ) -> Result<Paginated<CattlePurchase>, AppError> {
        let items = self.repo
            .list(&self.pool, filter, paging.limit(), paging.offset())
            .await?;
        let total = self.repo.count(&self.pool, filter).await?;
        Ok(Paginated::new(items, total, paging))
    }

    pub async fn get(&self, id: Uuid) -> Result<CattlePurchase, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::CattlePurchase))
    }

    /// Cria a compra e lança as despesas de aquisição, tudo na mesma transação.
    pub async fn create(&self, input: PurchaseInput, user_id: Option<Uuid>) -> Result<CattlePurchase, AppError> {
        let totals = compute_totals(&input)?;

        let mut tx = self.pool.begin().await?;

        // 1. Próximo código do mês (LOT-YYMMNNN)
        let period_prefix = code_period_prefix(LOT_CODE_PREFIX, input.purchase_date);
        lock_code_sequence(&mut tx, &period_prefix).await?;
        let last_code = self.repo.last_lot_code(&mut *tx, &period_prefix).await?;
        let lot_code = next_sequential_code(LOT_CODE_PREFIX, input.purchase_date, last_code.as_deref());

        // 2. A compra em si
        let purchase = self.repo.create(&mut *tx, &lot_code, &input, &totals).await?;

        // 3. Despesas vinculadas (compra dos animais, frete, comissão)
        self.record_expenses(&mut tx, &purchase, &[], user_id).await?;

        tx.commit().await?;

        tracing::info!(
            purchase_id = %purchase.id,
            lot_code = %purchase.lot_code,
            total_cost = %purchase.total_cost,
            "Compra de gado registrada"
        );
        Ok(purchase)
    }

    /// Recalcula os valores e refaz as despesas ainda não pagas.
    pub async fn update(
        &self,
        id: Uuid,
        input: PurchaseInput,
        user_id: Option<Uuid>,
    ) -> Result<CattlePurchase, AppError> {
        let totals = compute_totals(&input)?;

        let mut tx = self.pool.begin().await?;

        self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::CattlePurchase))?;

        let purchase = self.repo
            .update(&mut *tx, id, &input, &totals)
            .await?
            .ok_or(AppError::NotFound(Resource::CattlePurchase))?;

        let paid = self.finance_repo.paid_purchase_categories(&mut *tx, id).await?;
        self.finance_repo.delete_unpaid_purchase_expenses(&mut *tx, id).await?;
        self.record_expenses(&mut tx, &purchase, &paid, user_id).await?;

        tx.commit().await?;
        Ok(purchase)
    }

    /// Remove a compra e as despesas de aquisição em aberto.
    /// Com alguma despesa já paga a compra fica no razão e a remoção é recusada.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::CattlePurchase))?;

        let paid = self.finance_repo.paid_purchase_categories(&mut *tx, id).await?;
        ensure_deletable(&paid)?;

        self.finance_repo.delete_unpaid_purchase_expenses(&mut *tx, id).await?;
        self.repo.delete(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!(purchase_id = %id, "Compra removida");
        Ok(())
    }

    pub async fn register_reception(
        &self,
        id: Uuid,
        received_date: NaiveDate,
        received_weight: Decimal,
        actual_quantity: i32,
    ) -> Result<CattlePurchase, AppError> {
        let mut tx = self.pool.begin().await?;

        let purchase = self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::CattlePurchase))?;

        let reception = build_reception(&purchase, received_date, received_weight, actual_quantity)?;
        let updated = self.repo.register_reception(&mut *tx, id, &reception).await?;

        tx.commit().await?;

        tracing::info!(
            purchase_id = %id,
            weight_break = %reception.weight_break_percentage,
            transport_mortality = reception.transport_mortality,
            "Recepção registrada"
        );
        Ok(updated)
    }

    pub async fn register_deaths(&self, id: Uuid, count: i32) -> Result<CattlePurchase, AppError> {
        let mut tx = self.pool.begin().await?;

        let purchase = self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::CattlePurchase))?;

        if count > purchase.current_quantity {
            return Err(BusinessRule::InsufficientAnimals {
                available: purchase.current_quantity as i64,
                requested: count as i64,
            }
            .into());
        }

        let updated = self.repo.register_deaths(&mut *tx, id, count).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn record_expenses(
        &self,
        conn: &mut PgConnection,
        purchase: &CattlePurchase,
        skip_categories: &[String],
        user_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        for expense in acquisition_expenses(purchase, user_id) {
            if skip_categories.contains(&expense.category) {
                continue;
            }
            self.finance_repo.create_expense(&mut *conn, &expense).await?;
        }
        Ok(())
    }
}

/// Valor de compra pela arroba de carcaça, custo total e peso médio.
/// Resultados que não cabem nas colunas monetárias viram `AmountOutOfRange`.
pub fn compute_totals(input: &PurchaseInput) -> Result<PurchaseTotals, AppError> {
    let purchase_value = ensure_amount(
        input.purchase_weight
            .checked_mul(input.carcass_yield)
            .and_then(|carcass| carcass.checked_div(Decimal::ONE_HUNDRED))
            .and_then(|carcass| carcass.checked_div(KG_PER_ARROBA))
            .and_then(|arrobas| arrobas.checked_mul(input.price_per_arroba))
            .map(|value| value.round_dp(2)),
    )?;
    let total_cost = ensure_amount(
        purchase_value
            .checked_add(input.freight_cost)
            .and_then(|cost| cost.checked_add(input.commission)),
    )?;
    let average_weight = if input.initial_quantity > 0 {
        (input.purchase_weight / Decimal::from(input.initial_quantity)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    Ok(PurchaseTotals { purchase_value, total_cost, average_weight })
}

fn ensure_deletable(paid_categories: &[String]) -> Result<(), AppError> {
    if paid_categories.is_empty() {
        Ok(())
    } else {
        Err(BusinessRule::PurchaseHasPaidExpenses.into())
    }
}

/// Quebra de peso e mortalidade no transporte.
pub fn build_reception(
    purchase: &CattlePurchase,
    received_date: NaiveDate,
    received_weight: Decimal,
    actual_quantity: i32,
) -> Result<Reception, AppError> {
    if purchase.status != PurchaseStatus::Confirmed {
        return Err(BusinessRule::PurchaseNotConfirmed.into());
    }
    if actual_quantity > purchase.initial_quantity {
        return Err(BusinessRule::ReceivedQuantityExceedsInitial.into());
    }

    let weight_break_percentage = if purchase.purchase_weight.is_zero() {
        Decimal::ZERO
    } else {
        ((purchase.purchase_weight - received_weight) / purchase.purchase_weight * Decimal::ONE_HUNDRED)
            .round_dp(2)
    };

    Ok(Reception {
        received_date,
        received_weight,
        actual_quantity,
        weight_break_percentage,
        transport_mortality: purchase.initial_quantity - actual_quantity,
    })
}

/// Despesas lançadas junto com a compra. Frete e comissão só quando > 0.
pub fn acquisition_expenses(purchase: &CattlePurchase, user_id: Option<Uuid>) -> Vec<NewExpense> {
    let entries = [
        (CATEGORY_ANIMAL_PURCHASE, "Compra de animais", purchase.purchase_value, true),
        (CATEGORY_FREIGHT, "Frete", purchase.freight_cost, false),
        (CATEGORY_COMMISSION, "Comissão", purchase.commission, false),
    ];

    entries
        .into_iter()
        .filter(|(_, _, amount, always)| *always || *amount > Decimal::ZERO)
        .map(|(category, label, amount, _)| NewExpense {
            category: category.to_string(),
            description: format!("{label} - {}", purchase.lot_code),
            total_amount: amount,
            due_date: purchase.purchase_date,
            impacts_cash_flow: true,
            purchase_id: Some(purchase.id),
            lot_id: None,
            vendor_id: Some(purchase.vendor_id),
            payer_account_id: Some(purchase.payer_account_id),
            notes: None,
            user_id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cattle_purchase::{AnimalType, PurchasePaymentType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn input() -> PurchaseInput {
        PurchaseInput {
            vendor_id: Uuid::new_v4(),
            payer_account_id: Uuid::new_v4(),
            purchase_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            animal_type: AnimalType::Male,
            initial_quantity: 100,
            purchase_weight: dec!(36000),
            carcass_yield: dec!(50),
            price_per_arroba: dec!(300),
            payment_type: PurchasePaymentType::Cash,
            freight_cost: dec!(4500),
            commission: dec!(0),
            notes: None,
        }
    }

    fn purchase(input: &PurchaseInput) -> CattlePurchase {
        let totals = compute_totals(input).unwrap();
        CattlePurchase {
            id: Uuid::new_v4(),
            lot_code: "LOT-2503001".into(),
            vendor_id: input.vendor_id,
            payer_account_id: input.payer_account_id,
            purchase_date: input.purchase_date,
            animal_type: input.animal_type,
            initial_quantity: input.initial_quantity,
            current_quantity: input.initial_quantity,
            death_count: 0,
            purchase_weight: input.purchase_weight,
            carcass_yield: input.carcass_yield,
            price_per_arroba: input.price_per_arroba,
            payment_type: input.payment_type,
            freight_cost: input.freight_cost,
            commission: input.commission,
            purchase_value: totals.purchase_value,
            total_cost: totals.total_cost,
            average_weight: totals.average_weight,
            status: PurchaseStatus::Confirmed,
            received_date: None,
            received_weight: None,
            weight_break_percentage: None,
            transport_mortality: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn purchase_value_is_priced_by_carcass_arroba() {
        // 36.000 kg vivos * 50% = 18.000 kg de carcaça = 1.200 @ * R$ 300
        let totals = compute_totals(&input()).unwrap();
        assert_eq!(totals.purchase_value, dec!(360000));
        assert_eq!(totals.total_cost, dec!(364500));
        assert_eq!(totals.average_weight, dec!(360));
    }

    #[test]
    fn purchase_value_is_rounded_to_cents() {
        let mut input = input();
        input.purchase_weight = dec!(1000);
        input.carcass_yield = dec!(52.5);
        input.price_per_arroba = dec!(301.33);
        input.freight_cost = dec!(0);

        // 525 kg / 15 = 35 @ * 301,33 = 10.546,55
        let totals = compute_totals(&input).unwrap();
        assert_eq!(totals.purchase_value, dec!(10546.55));
        assert_eq!(totals.total_cost, totals.purchase_value);
    }

    #[test]
    fn huge_weight_is_rejected_instead_of_overflowing() {
        let mut input = input();
        input.purchase_weight = dec!(70000000000000000000000000000);
        input.carcass_yield = dec!(100);
        input.price_per_arroba = dec!(1);

        assert!(matches!(
            compute_totals(&input),
            Err(AppError::BusinessRule(BusinessRule::AmountOutOfRange))
        ));
    }

    #[test]
    fn value_beyond_the_money_columns_is_rejected() {
        let mut input = input();
        input.purchase_weight = dec!(9999999999999);
        input.carcass_yield = dec!(100);
        input.price_per_arroba = dec!(9999999999999);

        assert!(compute_totals(&input).is_err());
    }

    #[test]
    fn purchase_with_paid_expenses_cannot_be_deleted() {
        assert!(ensure_deletable(&[]).is_ok());
        assert!(matches!(
            ensure_deletable(&["animal_purchase".to_string()]),
            Err(AppError::BusinessRule(BusinessRule::PurchaseHasPaidExpenses))
        ));
    }

    #[test]
    fn only_positive_freight_and_commission_become_expenses() {
        let input = input();
        let purchase = purchase(&input);
        let expenses = acquisition_expenses(&purchase, None);

        let categories: Vec<_> = expenses.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(categories, ["animal_purchase", "freight"]);
        assert!(expenses.iter().all(|e| e.purchase_id == Some(purchase.id)));
        assert!(expenses.iter().all(|e| e.due_date == purchase.purchase_date));
        assert_eq!(expenses[0].total_amount, dec!(360000));
    }

    #[test]
    fn reception_computes_weight_break_and_transport_deaths() {
        let purchase = purchase(&input());
        let date = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();

        let reception = build_reception(&purchase, date, dec!(34920), 98).unwrap();

        assert_eq!(reception.weight_break_percentage, dec!(3));
        assert_eq!(reception.transport_mortality, 2);
    }

    #[test]
    fn reception_requires_confirmed_purchase() {
        let mut purchase = purchase(&input());
        purchase.status = PurchaseStatus::Received;
        let date = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();

        let err = build_reception(&purchase, date, dec!(35000), 100).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(BusinessRule::PurchaseNotConfirmed)));
    }

    #[test]
    fn reception_cannot_receive_more_than_bought() {
        let purchase = purchase(&input());
        let date = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();

        let err = build_reception(&purchase, date, dec!(35000), 101).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(BusinessRule::ReceivedQuantityExceedsInitial)));
    }
}

// src/db/cattle_purchase_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::map_constraint_error,
        error::{AppError, Resource},
    },
    models::cattle_purchase::{
        CattlePurchase, PurchaseFilter, PurchaseInput, PurchaseStatus, PurchaseTotals, Reception,
    },
};

const PURCHASE_COLUMNS: &str = r#"
    id, lot_code, vendor_id, payer_account_id, purchase_date, animal_type,
    initial_quantity, current_quantity, death_count,
    purchase_weight, carcass_yield, price_per_arroba, payment_type,
    freight_cost, commission, purchase_value, total_cost, average_weight,
    status, received_date, received_weight, weight_break_percentage,
    transport_mortality, notes, created_at, updated_at
"#;

// Fornecedor ou conta pagadora inexistente
fn map_reference_error(e: sqlx::Error, lot_code: &str) -> AppError {
    map_constraint_error(
        e,
        |_| AppError::DuplicateValue { field: "lotCode", value: lot_code.to_string() },
        |constraint| {
            if constraint.contains("payer_account") {
                AppError::InvalidReference("payerAccountId")
            } else {
                AppError::InvalidReference("vendorId")
            }
        },
    )
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PurchaseFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(vendor_id) = filter.vendor_id {
        qb.push(" AND vendor_id = ").push_bind(vendor_id);
    }
}

#[derive(Clone, Default)]
pub struct CattlePurchaseRepository;

impl CattlePurchaseRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &PurchaseFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CattlePurchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(format!("SELECT {PURCHASE_COLUMNS} FROM cattle_purchases"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY purchase_date DESC, lot_code DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let purchases = qb.build_query_as::<CattlePurchase>().fetch_all(executor).await?;
        Ok(purchases)
    }

    pub async fn count<'e, E>(&self, executor: E, filter: &PurchaseFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM cattle_purchases");
        push_filters(&mut qb, filter);
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<CattlePurchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, CattlePurchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM cattle_purchases WHERE id = $1"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(purchase)
    }

    /// Mesma busca, travando a linha até o fim da transação.
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<CattlePurchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, CattlePurchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM cattle_purchases WHERE id = $1 FOR UPDATE"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(purchase)
    }

    /// Maior `lot_code` já emitido com o prefixo do mês (ex: `LOT-2503`).
    pub async fn last_lot_code<'e, E>(&self, executor: E, period_prefix: &str) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let code = sqlx::query_scalar::<_, String>(
            "SELECT lot_code FROM cattle_purchases WHERE lot_code LIKE $1 ORDER BY length(lot_code) DESC, lot_code DESC LIMIT 1",
        )
            .bind(format!("{period_prefix}%"))
            .fetch_optional(executor)
            .await?;
        Ok(code)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        lot_code: &str,
        input: &PurchaseInput,
        totals: &PurchaseTotals,
    ) -> Result<CattlePurchase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CattlePurchase>(&format!(
            r#"
            INSERT INTO cattle_purchases (
                lot_code, vendor_id, payer_account_id, purchase_date, animal_type,
                initial_quantity, current_quantity, purchase_weight, carcass_yield,
                price_per_arroba, payment_type, freight_cost, commission,
                purchase_value, total_cost, average_weight, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
            .bind(lot_code)
            .bind(input.vendor_id)
            .bind(input.payer_account_id)
            .bind(input.purchase_date)
            .bind(input.animal_type)
            .bind(input.initial_quantity)
            .bind(input.purchase_weight)
            .bind(input.carcass_yield)
            .bind(input.price_per_arroba)
            .bind(input.payment_type)
            .bind(input.freight_cost)
            .bind(input.commission)
            .bind(totals.purchase_value)
            .bind(totals.total_cost)
            .bind(totals.average_weight)
            .bind(&input.notes)
            .fetch_one(executor)
            .await
            .map_err(|e| map_reference_error(e, lot_code))
    }

    /// Atualiza as entradas e os valores recalculados.
    ///
    /// `current_quantity` acompanha a mudança de `initial_quantity`, descontadas as mortes.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &PurchaseInput,
        totals: &PurchaseTotals,
    ) -> Result<Option<CattlePurchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CattlePurchase>(&format!(
            r#"
            UPDATE cattle_purchases SET
                vendor_id = $2, payer_account_id = $3, purchase_date = $4, animal_type = $5,
                current_quantity = GREATEST($6 - death_count - COALESCE(transport_mortality, 0), 0),
                initial_quantity = $6,
                purchase_weight = $7, carcass_yield = $8, price_per_arroba = $9,
                payment_type = $10, freight_cost = $11, commission = $12,
                purchase_value = $13, total_cost = $14, average_weight = $15,
                notes = $16, updated_at = NOW()
            WHERE id = $1
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(input.vendor_id)
            .bind(input.payer_account_id)
            .bind(input.purchase_date)
            .bind(input.animal_type)
            .bind(input.initial_quantity)
            .bind(input.purchase_weight)
            .bind(input.carcass_yield)
            .bind(input.price_per_arroba)
            .bind(input.payment_type)
            .bind(input.freight_cost)
            .bind(input.commission)
            .bind(totals.purchase_value)
            .bind(totals.total_cost)
            .bind(totals.average_weight)
            .bind(&input.notes)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_reference_error(e, ""))
    }

    pub async fn register_reception<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        reception: &Reception,
    ) -> Result<CattlePurchase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, CattlePurchase>(&format!(
            r#"
            UPDATE cattle_purchases SET
                received_date = $2, received_weight = $3, weight_break_percentage = $4,
                transport_mortality = $5, current_quantity = $6, status = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(reception.received_date)
            .bind(reception.received_weight)
            .bind(reception.weight_break_percentage)
            .bind(reception.transport_mortality)
            .bind(reception.actual_quantity)
            .bind(PurchaseStatus::Received)
            .fetch_one(executor)
            .await?;
        Ok(purchase)
    }

    pub async fn register_deaths<'e, E>(&self, executor: E, id: Uuid, count: i32) -> Result<CattlePurchase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, CattlePurchase>(&format!(
            r#"
            UPDATE cattle_purchases SET
                death_count = death_count + $2,
                current_quantity = current_quantity - $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(count)
            .fetch_one(executor)
            .await?;
        Ok(purchase)
    }

    /// Remove a compra (as despesas geradas caem em cascata).
    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM cattle_purchases WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                map_constraint_error(
                    e,
                    |_| AppError::ResourceInUse(Resource::CattlePurchase),
                    |_| AppError::ResourceInUse(Resource::CattlePurchase),
                )
            })?;
        Ok(result.rows_affected() > 0)
    }
}

// src/db/sale_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_constraint_error, error::AppError},
    models::sale::{PipelineStage, SaleData, SaleFilter, SaleRecord, SaleStatus},
};

const SALE_COLUMNS: &str = r#"
    id, sale_number, lot_id, buyer_id, sale_date, quantity, total_weight,
    price_per_kg, total_amount, payment_type, payment_due_date, status, notes,
    created_at, updated_at
"#;

fn map_sale_error(e: sqlx::Error, sale_number: &str) -> AppError {
    map_constraint_error(
        e,
        |_| AppError::DuplicateValue { field: "saleNumber", value: sale_number.to_string() },
        |constraint| {
            if constraint.contains("buyer") {
                AppError::InvalidReference("buyerId")
            } else {
                AppError::InvalidReference("lotId")
            }
        },
    )
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &SaleFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(lot_id) = filter.lot_id {
        qb.push(" AND lot_id = ").push_bind(lot_id);
    }
    if let Some(buyer_id) = filter.buyer_id {
        qb.push(" AND buyer_id = ").push_bind(buyer_id);
    }
}

#[derive(sqlx::FromRow)]
struct StageRow {
    status: SaleStatus,
    count: i64,
    total_amount: Decimal,
}

#[derive(Clone, Default)]
pub struct SaleRepository;

impl SaleRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &SaleFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SaleRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sale_records"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY sale_date DESC, sale_number DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let sales = qb.build_query_as::<SaleRecord>().fetch_all(executor).await?;
        Ok(sales)
    }

    pub async fn count<'e, E>(&self, executor: E, filter: &SaleFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM sale_records");
        push_filters(&mut qb, filter);
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<SaleRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, SaleRecord>(&format!("SELECT {SALE_COLUMNS} FROM sale_records WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn find_by_id_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<SaleRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, SaleRecord>(&format!(
            "SELECT {SALE_COLUMNS} FROM sale_records WHERE id = $1 FOR UPDATE"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn last_sale_number<'e, E>(&self, executor: E, period_prefix: &str) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let number = sqlx::query_scalar::<_, String>(
            "SELECT sale_number FROM sale_records WHERE sale_number LIKE $1 ORDER BY length(sale_number) DESC, sale_number DESC LIMIT 1",
        )
            .bind(format!("{period_prefix}%"))
            .fetch_optional(executor)
            .await?;
        Ok(number)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        sale_number: &str,
        data: &SaleData,
        total_amount: Decimal,
    ) -> Result<SaleRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SaleRecord>(&format!(
            r#"
            INSERT INTO sale_records (
                sale_number, lot_id, buyer_id, sale_date, quantity, total_weight,
                price_per_kg, total_amount, payment_type, payment_due_date, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {SALE_COLUMNS}
            "#
        ))
            .bind(sale_number)
            .bind(data.lot_id)
            .bind(data.buyer_id)
            .bind(data.sale_date)
            .bind(data.quantity)
            .bind(data.total_weight)
            .bind(data.price_per_kg)
            .bind(total_amount)
            .bind(data.payment_type)
            .bind(data.payment_due_date)
            .bind(&data.notes)
            .fetch_one(executor)
            .await
            .map_err(|e| map_sale_error(e, sale_number))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        data: &SaleData,
        total_amount: Decimal,
    ) -> Result<Option<SaleRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SaleRecord>(&format!(
            r#"
            UPDATE sale_records SET
                lot_id = $2, buyer_id = $3, sale_date = $4, quantity = $5, total_weight = $6,
                price_per_kg = $7, total_amount = $8, payment_type = $9,
                payment_due_date = $10, notes = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING {SALE_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(data.lot_id)
            .bind(data.buyer_id)
            .bind(data.sale_date)
            .bind(data.quantity)
            .bind(data.total_weight)
            .bind(data.price_per_kg)
            .bind(total_amount)
            .bind(data.payment_type)
            .bind(data.payment_due_date)
            .bind(&data.notes)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_sale_error(e, ""))
    }

    pub async fn set_status<'e, E>(&self, executor: E, id: Uuid, status: SaleStatus) -> Result<SaleRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, SaleRecord>(&format!(
            "UPDATE sale_records SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {SALE_COLUMNS}"
        ))
            .bind(id)
            .bind(status)
            .fetch_one(executor)
            .await?;
        Ok(sale)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM sale_records WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Quantidade e valor por coluna do kanban (colunas vazias incluídas).
    pub async fn pipeline<'e, E>(&self, executor: E) -> Result<Vec<PipelineStage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, StageRow>(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS total_amount
            FROM sale_records
            GROUP BY status
            "#,
        )
            .fetch_all(executor)
            .await?;

        let stages = SaleStatus::ALL
            .iter()
            .map(|status| {
                let row = rows.iter().find(|r| r.status == *status);
                PipelineStage {
                    status: *status,
                    count: row.map(|r| r.count).unwrap_or(0),
                    total_amount: row.map(|r| r.total_amount).unwrap_or(Decimal::ZERO),
                }
            })
            .collect();
        Ok(stages)
    }
}

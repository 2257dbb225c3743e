// src/db/lot_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::map_constraint_error,
        error::{AppError, Resource},
    },
    models::lot::{
        Lot, LotData, LotFilter, LotMovement, LotStatus, MortalityRecord, NewMovement, WeightRecord,
    },
};

const LOT_COLUMNS: &str = r#"
    id, name, description, purchase_id, pen_id, initial_weight, expected_animals,
    current_quantity, entry_date, status, created_at, updated_at
"#;

fn map_lot_error(e: sqlx::Error, name: &str) -> AppError {
    map_constraint_error(
        e,
        |_| AppError::DuplicateValue { field: "name", value: name.to_string() },
        |_| AppError::InvalidReference("purchaseId"),
    )
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &LotFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(pen_id) = filter.pen_id {
        qb.push(" AND pen_id = ").push_bind(pen_id);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(format!("%{search}%"));
    }
}

#[derive(Clone, Default)]
pub struct LotRepository;

impl LotRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Lotes
    // ---

    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &LotFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(format!("SELECT {LOT_COLUMNS} FROM lots"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY entry_date DESC, name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let lots = qb.build_query_as::<Lot>().fetch_all(executor).await?;
        Ok(lots)
    }

    pub async fn count<'e, E>(&self, executor: E, filter: &LotFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM lots");
        push_filters(&mut qb, filter);
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>(&format!("SELECT {LOT_COLUMNS} FROM lots WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(lot)
    }

    pub async fn find_by_id_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>(&format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE id = $1 FOR UPDATE"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(lot)
    }

    /// O lote começa com todos os animais esperados.
    pub async fn create<'e, E>(&self, executor: E, data: &LotData) -> Result<Lot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lot>(&format!(
            r#"
            INSERT INTO lots (
                name, description, purchase_id, initial_weight,
                expected_animals, current_quantity, entry_date
            )
            VALUES ($1, $2, $3, $4, $5, $5, $6)
            RETURNING {LOT_COLUMNS}
            "#
        ))
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.purchase_id)
            .bind(data.initial_weight)
            .bind(data.expected_animals)
            .bind(data.entry_date)
            .fetch_one(executor)
            .await
            .map_err(|e| map_lot_error(e, &data.name))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        data: &LotData,
        current_quantity: i32,
        status: LotStatus,
    ) -> Result<Option<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lot>(&format!(
            r#"
            UPDATE lots SET
                name = $2, description = $3, purchase_id = $4, initial_weight = $5,
                expected_animals = $6, entry_date = $7, status = $8, current_quantity = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {LOT_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.purchase_id)
            .bind(data.initial_weight)
            .bind(data.expected_animals)
            .bind(data.entry_date)
            .bind(status)
            .bind(current_quantity)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_lot_error(e, &data.name))
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM lots WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                map_constraint_error(
                    e,
                    |_| AppError::ResourceInUse(Resource::Lot),
                    |_| AppError::ResourceInUse(Resource::Lot),
                )
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// Ajusta a quantidade atual e o status do lote.
    pub async fn set_quantity<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        current_quantity: i32,
        status: LotStatus,
    ) -> Result<Lot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>(&format!(
            r#"
            UPDATE lots SET current_quantity = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {LOT_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(current_quantity)
            .bind(status)
            .fetch_one(executor)
            .await?;
        Ok(lot)
    }

    pub async fn set_pen<'e, E>(&self, executor: E, id: Uuid, pen_id: Option<Uuid>) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE lots SET pen_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(pen_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Cabeças do lote já alocadas em algum curral.
    pub async fn allocated_quantity<'e, E>(&self, executor: E, lot_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let allocated = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM pen_allocations WHERE lot_id = $1 AND status = 'ACTIVE'",
        )
            .bind(lot_id)
            .fetch_one(executor)
            .await?;
        Ok(allocated)
    }

    /// Custo por cabeça herdado da compra vinculada (`total_cost / initial_quantity`).
    pub async fn cost_per_head<'e, E>(&self, executor: E, lot_id: Uuid) -> Result<Option<Decimal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cost = sqlx::query_scalar::<_, Option<Decimal>>(
            r#"
            SELECT ROUND(p.total_cost / NULLIF(p.initial_quantity, 0), 2)
            FROM lots l
            JOIN cattle_purchases p ON p.id = l.purchase_id
            WHERE l.id = $1
            "#,
        )
            .bind(lot_id)
            .fetch_optional(executor)
            .await?;
        Ok(cost.flatten())
    }

    // ---
    // Pesagens
    // ---

    pub async fn create_weight_record<'e, E>(
        &self,
        executor: E,
        lot_id: Uuid,
        weighing_date: NaiveDate,
        average_weight: Decimal,
        sample_size: i32,
        notes: Option<&str>,
    ) -> Result<WeightRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, WeightRecord>(
            r#"
            INSERT INTO lot_weight_records (lot_id, weighing_date, average_weight, sample_size, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, lot_id, weighing_date, average_weight, sample_size, notes, created_at
            "#,
        )
            .bind(lot_id)
            .bind(weighing_date)
            .bind(average_weight)
            .bind(sample_size)
            .bind(notes)
            .fetch_one(executor)
            .await?;
        Ok(record)
    }

    /// Pesagens do lote, da mais recente para a mais antiga.
    pub async fn list_weight_records<'e, E>(&self, executor: E, lot_id: Uuid) -> Result<Vec<WeightRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, WeightRecord>(
            r#"
            SELECT id, lot_id, weighing_date, average_weight, sample_size, notes, created_at
            FROM lot_weight_records
            WHERE lot_id = $1
            ORDER BY weighing_date DESC, created_at DESC
            "#,
        )
            .bind(lot_id)
            .fetch_all(executor)
            .await?;
        Ok(records)
    }

    // ---
    // Mortalidade
    // ---

    pub async fn create_mortality_record<'e, E>(
        &self,
        executor: E,
        lot_id: Uuid,
        record_date: NaiveDate,
        quantity: i32,
        cause: &str,
        notes: Option<&str>,
    ) -> Result<MortalityRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, MortalityRecord>(
            r#"
            INSERT INTO lot_mortality_records (lot_id, record_date, quantity, cause, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, lot_id, record_date, quantity, cause, notes, created_at
            "#,
        )
            .bind(lot_id)
            .bind(record_date)
            .bind(quantity)
            .bind(cause)
            .bind(notes)
            .fetch_one(executor)
            .await?;
        Ok(record)
    }

    pub async fn list_mortality_records<'e, E>(
        &self,
        executor: E,
        lot_id: Uuid,
    ) -> Result<Vec<MortalityRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let records = sqlx::query_as::<_, MortalityRecord>(
            r#"
            SELECT id, lot_id, record_date, quantity, cause, notes, created_at
            FROM lot_mortality_records
            WHERE lot_id = $1
            ORDER BY record_date DESC, created_at DESC
            "#,
        )
            .bind(lot_id)
            .fetch_all(executor)
            .await?;
        Ok(records)
    }

    // ---
    // Movimentações
    // ---

    pub async fn create_movement<'e, E>(&self, executor: E, movement: &NewMovement) -> Result<LotMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, LotMovement>(
            r#"
            INSERT INTO lot_movements (lot_id, movement_type, from_pen_id, to_pen_id, quantity, reason, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, lot_id, movement_type, from_pen_id, to_pen_id, quantity, reason, user_id, movement_date
            "#,
        )
            .bind(movement.lot_id)
            .bind(movement.movement_type)
            .bind(movement.from_pen_id)
            .bind(movement.to_pen_id)
            .bind(movement.quantity)
            .bind(&movement.reason)
            .bind(movement.user_id)
            .fetch_one(executor)
            .await?;
        Ok(created)
    }

    pub async fn list_movements<'e, E>(&self, executor: E, lot_id: Uuid) -> Result<Vec<LotMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, LotMovement>(
            r#"
            SELECT id, lot_id, movement_type, from_pen_id, to_pen_id, quantity, reason, user_id, movement_date
            FROM lot_movements
            WHERE lot_id = $1
            ORDER BY movement_date DESC
            "#,
        )
            .bind(lot_id)
            .fetch_all(executor)
            .await?;
        Ok(movements)
    }
}

// src/db/pen_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::map_constraint_error,
        error::{AppError, Resource},
    },
    models::pen::{AllocationStatus, Pen, PenAllocation, PenData, PenStatus},
};

const PEN_COLUMNS: &str = "id, name, capacity, location, status, is_active, created_at, updated_at";
const ALLOCATION_COLUMNS: &str = "id, pen_id, lot_id, quantity, status, allocated_at, released_at";

fn map_pen_error(e: sqlx::Error, name: &str) -> AppError {
    map_constraint_error(
        e,
        |_| AppError::DuplicateValue { field: "name", value: name.to_string() },
        |_| AppError::ResourceInUse(Resource::Pen),
    )
}

#[derive(Clone, Default)]
pub struct PenRepository;

impl PenRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Currais
    // ---

    pub async fn list<'e, E>(&self, executor: E, status: Option<PenStatus>) -> Result<Vec<Pen>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pens = sqlx::query_as::<_, Pen>(&format!(
            "SELECT {PEN_COLUMNS} FROM pens WHERE ($1::pen_status IS NULL OR status = $1) ORDER BY name ASC"
        ))
            .bind(status)
            .fetch_all(executor)
            .await?;
        Ok(pens)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Pen>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pen = sqlx::query_as::<_, Pen>(&format!("SELECT {PEN_COLUMNS} FROM pens WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(pen)
    }

    /// Trava a linha do curral: alocações concorrentes esperam aqui.
    pub async fn find_by_id_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Pen>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pen = sqlx::query_as::<_, Pen>(&format!(
            "SELECT {PEN_COLUMNS} FROM pens WHERE id = $1 FOR UPDATE"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(pen)
    }

    pub async fn create<'e, E>(&self, executor: E, data: &PenData) -> Result<Pen, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Pen>(&format!(
            r#"
            INSERT INTO pens (name, capacity, location, status, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PEN_COLUMNS}
            "#
        ))
            .bind(&data.name)
            .bind(data.capacity)
            .bind(&data.location)
            .bind(data.status)
            .bind(data.is_active)
            .fetch_one(executor)
            .await
            .map_err(|e| map_pen_error(e, &data.name))
    }

    pub async fn update<'e, E>(&self, executor: E, id: Uuid, data: &PenData) -> Result<Option<Pen>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Pen>(&format!(
            r#"
            UPDATE pens SET
                name = $2, capacity = $3, location = $4, status = $5, is_active = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PEN_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(&data.name)
            .bind(data.capacity)
            .bind(&data.location)
            .bind(data.status)
            .bind(data.is_active)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_pen_error(e, &data.name))
    }

    pub async fn set_status<'e, E>(&self, executor: E, id: Uuid, status: PenStatus) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE pens SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM pens WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_pen_error(e, ""))?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Alocações
    // ---

    /// Soma das alocações ativas do curral.
    pub async fn occupied<'e, E>(&self, executor: E, pen_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let occupied = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM pen_allocations WHERE pen_id = $1 AND status = 'ACTIVE'",
        )
            .bind(pen_id)
            .fetch_one(executor)
            .await?;
        Ok(occupied)
    }

    /// Cabeças de um lote específico dentro do curral.
    pub async fn lot_quantity_in_pen<'e, E>(&self, executor: E, pen_id: Uuid, lot_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quantity = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM pen_allocations
            WHERE pen_id = $1 AND lot_id = $2 AND status = 'ACTIVE'
            "#,
        )
            .bind(pen_id)
            .bind(lot_id)
            .fetch_one(executor)
            .await?;
        Ok(quantity)
    }

    pub async fn active_allocations<'e, E>(&self, executor: E, pen_id: Uuid) -> Result<Vec<PenAllocation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let allocations = sqlx::query_as::<_, PenAllocation>(&format!(
            r#"
            SELECT {ALLOCATION_COLUMNS} FROM pen_allocations
            WHERE pen_id = $1 AND status = 'ACTIVE'
            ORDER BY allocated_at ASC
            "#
        ))
            .bind(pen_id)
            .fetch_all(executor)
            .await?;
        Ok(allocations)
    }

    pub async fn find_allocation<'e, E>(
        &self,
        executor: E,
        pen_id: Uuid,
        allocation_id: Uuid,
    ) -> Result<Option<PenAllocation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let allocation = sqlx::query_as::<_, PenAllocation>(&format!(
            "SELECT {ALLOCATION_COLUMNS} FROM pen_allocations WHERE id = $1 AND pen_id = $2"
        ))
            .bind(allocation_id)
            .bind(pen_id)
            .fetch_optional(executor)
            .await?;
        Ok(allocation)
    }

    pub async fn create_allocation<'e, E>(
        &self,
        executor: E,
        pen_id: Uuid,
        lot_id: Uuid,
        quantity: i32,
    ) -> Result<PenAllocation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let allocation = sqlx::query_as::<_, PenAllocation>(&format!(
            r#"
            INSERT INTO pen_allocations (pen_id, lot_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING {ALLOCATION_COLUMNS}
            "#
        ))
            .bind(pen_id)
            .bind(lot_id)
            .bind(quantity)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                map_constraint_error(
                    e,
                    |_| AppError::ResourceInUse(Resource::PenAllocation),
                    |_| AppError::InvalidReference("lotId"),
                )
            })?;
        Ok(allocation)
    }

    pub async fn release_allocation<'e, E>(&self, executor: E, allocation_id: Uuid) -> Result<PenAllocation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let allocation = sqlx::query_as::<_, PenAllocation>(&format!(
            r#"
            UPDATE pen_allocations SET status = $2, released_at = NOW()
            WHERE id = $1
            RETURNING {ALLOCATION_COLUMNS}
            "#
        ))
            .bind(allocation_id)
            .bind(AllocationStatus::Released)
            .fetch_one(executor)
            .await?;
        Ok(allocation)
    }

    /// Libera todas as alocações ativas de um lote em um curral.
    pub async fn release_lot_in_pen<'e, E>(&self, executor: E, pen_id: Uuid, lot_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE pen_allocations SET status = 'RELEASED', released_at = NOW()
            WHERE pen_id = $1 AND lot_id = $2 AND status = 'ACTIVE'
            "#,
        )
            .bind(pen_id)
            .bind(lot_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn lot_allocations<'e, E>(&self, executor: E, lot_id: Uuid) -> Result<Vec<PenAllocation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let allocations = sqlx::query_as::<_, PenAllocation>(&format!(
            r#"
            SELECT {ALLOCATION_COLUMNS} FROM pen_allocations
            WHERE lot_id = $1 AND status = 'ACTIVE'
            ORDER BY allocated_at DESC
            "#
        ))
            .bind(lot_id)
            .fetch_all(executor)
            .await?;
        Ok(allocations)
    }

    pub async fn set_allocation_quantity<'e, E>(&self, executor: E, allocation_id: Uuid, quantity: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE pen_allocations SET quantity = $2 WHERE id = $1")
            .bind(allocation_id)
            .bind(quantity)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Currais onde o lote tem animais alocados.
    pub async fn pens_of_lot<'e, E>(&self, executor: E, lot_id: Uuid) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pens = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT pen_id FROM pen_allocations WHERE lot_id = $1 AND status = 'ACTIVE'",
        )
            .bind(lot_id)
            .fetch_all(executor)
            .await?;
        Ok(pens)
    }
}

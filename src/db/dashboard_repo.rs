// src/db/dashboard_repo.rs

use sqlx::{Executor, Postgres};

use crate::{common::error::AppError, models::dashboard::ActiveLotSnapshot};

#[derive(Clone, Default)]
pub struct DashboardRepository;

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    // 1. Lotes ativos com a última pesagem e o total de mortes
    pub async fn active_lots<'e, E>(&self, executor: E) -> Result<Vec<ActiveLotSnapshot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lots = sqlx::query_as::<_, ActiveLotSnapshot>(
            r#"
            SELECT
                l.current_quantity,
                l.expected_animals,
                l.initial_weight,
                l.entry_date,
                w.average_weight AS latest_weight,
                COALESCE(m.total_deaths, 0)::BIGINT AS total_deaths
            FROM lots l
            LEFT JOIN LATERAL (
                SELECT average_weight
                FROM lot_weight_records
                WHERE lot_id = l.id
                ORDER BY weighing_date DESC, created_at DESC
                LIMIT 1
            ) w ON TRUE
            LEFT JOIN LATERAL (
                SELECT SUM(quantity) AS total_deaths
                FROM lot_mortality_records
                WHERE lot_id = l.id
            ) m ON TRUE
            WHERE l.status = 'ACTIVE'
            "#,
        )
            .fetch_all(executor)
            .await?;
        Ok(lots)
    }

    // 2. Currais com animais alocados
    pub async fn occupied_pens<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT pen_id)
            FROM pen_allocations
            WHERE status = 'ACTIVE' AND quantity > 0
            "#,
        )
            .fetch_one(executor)
            .await?;
        Ok(total)
    }
}

// src/db/intervention_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_constraint_error, error::AppError},
    models::intervention::{
        ActivityTotals, CauseTotals, HealthIntervention, HealthTotals, HistoryEntry, HistoryFilter,
        InterventionFilter, NewIntervention,
    },
};

const INTERVENTION_COLUMNS: &str = r#"
    id, lot_id, pen_id, intervention_type, product_name, dose, unit, application_date,
    veterinarian, batch_number, cost, expense_id, notes, user_id, created_at
"#;

// Linha do tempo unificada; cada braço expõe as mesmas colunas
const HISTORY_SOURCE: &str = r#"
    SELECT * FROM (
        SELECT 'HEALTH' AS kind, id, lot_id, pen_id, application_date AS event_date,
               NULL::INTEGER AS quantity,
               intervention_type::TEXT || ' - ' || product_name AS description,
               cost
        FROM health_interventions
        UNION ALL
        SELECT 'MORTALITY', id, lot_id, NULL::UUID, record_date, quantity, cause, NULL::NUMERIC
        FROM lot_mortality_records
        UNION ALL
        SELECT 'MOVEMENT', id, lot_id, COALESCE(to_pen_id, from_pen_id), movement_date::DATE, quantity,
               movement_type::TEXT || COALESCE(' - ' || reason, ''), NULL::NUMERIC
        FROM lot_movements
        UNION ALL
        SELECT 'WEIGHING', id, lot_id, NULL::UUID, weighing_date, sample_size,
               'Peso médio ' || average_weight::TEXT || ' kg', NULL::NUMERIC
        FROM lot_weight_records
    ) h
"#;

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &InterventionFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(lot_id) = filter.lot_id {
        qb.push(" AND lot_id = ").push_bind(lot_id);
    }
    if let Some(pen_id) = filter.pen_id {
        qb.push(" AND pen_id = ").push_bind(pen_id);
    }
    if let Some(kind) = filter.intervention_type {
        qb.push(" AND intervention_type = ").push_bind(kind);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND application_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND application_date <= ").push_bind(end);
    }
}

fn push_history_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &HistoryFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(lot_id) = filter.lot_id {
        qb.push(" AND h.lot_id = ").push_bind(lot_id);
    }
    if let Some(pen_id) = filter.pen_id {
        qb.push(" AND h.pen_id = ").push_bind(pen_id);
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND h.kind = ").push_bind(kind.as_str());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND h.event_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND h.event_date <= ").push_bind(end);
    }
}

#[derive(Clone, Default)]
pub struct InterventionRepository;

impl InterventionRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &InterventionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HealthIntervention>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(format!("SELECT {INTERVENTION_COLUMNS} FROM health_interventions"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY application_date DESC, created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let items = qb.build_query_as::<HealthIntervention>().fetch_all(executor).await?;
        Ok(items)
    }

    pub async fn count<'e, E>(&self, executor: E, filter: &InterventionFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM health_interventions");
        push_filters(&mut qb, filter);
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<HealthIntervention>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let intervention = sqlx::query_as::<_, HealthIntervention>(&format!(
            "SELECT {INTERVENTION_COLUMNS} FROM health_interventions WHERE id = $1"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(intervention)
    }

    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<HealthIntervention>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let intervention = sqlx::query_as::<_, HealthIntervention>(&format!(
            "SELECT {INTERVENTION_COLUMNS} FROM health_interventions WHERE id = $1 FOR UPDATE"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(intervention)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        data: &NewIntervention,
        expense_id: Option<Uuid>,
    ) -> Result<HealthIntervention, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, HealthIntervention>(&format!(
            r#"
            INSERT INTO health_interventions (
                lot_id, pen_id, intervention_type, product_name, dose, unit, application_date,
                veterinarian, batch_number, cost, expense_id, notes, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {INTERVENTION_COLUMNS}
            "#
        ))
            .bind(data.lot_id)
            .bind(data.pen_id)
            .bind(data.intervention_type)
            .bind(&data.product_name)
            .bind(data.dose)
            .bind(&data.unit)
            .bind(data.application_date)
            .bind(&data.veterinarian)
            .bind(&data.batch_number)
            .bind(data.cost)
            .bind(expense_id)
            .bind(&data.notes)
            .bind(data.user_id)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                map_constraint_error(
                    e,
                    |_| AppError::InvalidReference("id"),
                    |constraint| {
                        if constraint.contains("pen") {
                            AppError::InvalidReference("penId")
                        } else {
                            AppError::InvalidReference("lotId")
                        }
                    },
                )
            })
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM health_interventions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Histórico
    // ---

    pub async fn history<'e, E>(
        &self,
        executor: E,
        filter: &HistoryFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HistoryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(HISTORY_SOURCE);
        push_history_filters(&mut qb, filter);
        qb.push(" ORDER BY h.event_date DESC, h.kind ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let entries = qb.build_query_as::<HistoryEntry>().fetch_all(executor).await?;
        Ok(entries)
    }

    pub async fn count_history<'e, E>(&self, executor: E, filter: &HistoryFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM ({HISTORY_SOURCE}"));
        push_history_filters(&mut qb, filter);
        qb.push(") c");
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    // ---
    // Estatísticas
    // ---

    pub async fn health_totals<'e, E>(
        &self,
        executor: E,
        lot_id: Option<Uuid>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<HealthTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, HealthTotals>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE intervention_type = 'VACCINE') AS vaccines,
                COUNT(*) FILTER (WHERE intervention_type = 'MEDICATION') AS medications,
                COUNT(*) FILTER (WHERE intervention_type = 'TREATMENT') AS treatments,
                COALESCE(SUM(cost), 0) AS total_cost
            FROM health_interventions
            WHERE ($1::UUID IS NULL OR lot_id = $1)
              AND ($2::DATE IS NULL OR application_date >= $2)
              AND ($3::DATE IS NULL OR application_date <= $3)
            "#,
        )
            .bind(lot_id)
            .bind(start)
            .bind(end)
            .fetch_one(executor)
            .await?;
        Ok(totals)
    }

    pub async fn activity_totals<'e, E>(
        &self,
        executor: E,
        lot_id: Option<Uuid>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<ActivityTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, ActivityTotals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM lot_mortality_records
                 WHERE ($1::UUID IS NULL OR lot_id = $1)
                   AND ($2::DATE IS NULL OR record_date >= $2)
                   AND ($3::DATE IS NULL OR record_date <= $3)) AS mortality_events,
                (SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM lot_mortality_records
                 WHERE ($1::UUID IS NULL OR lot_id = $1)
                   AND ($2::DATE IS NULL OR record_date >= $2)
                   AND ($3::DATE IS NULL OR record_date <= $3)) AS total_deaths,
                (SELECT COUNT(*) FROM lot_movements
                 WHERE ($1::UUID IS NULL OR lot_id = $1)
                   AND ($2::DATE IS NULL OR movement_date::DATE >= $2)
                   AND ($3::DATE IS NULL OR movement_date::DATE <= $3)) AS movements,
                (SELECT COUNT(*) FROM lot_weight_records
                 WHERE ($1::UUID IS NULL OR lot_id = $1)
                   AND ($2::DATE IS NULL OR weighing_date >= $2)
                   AND ($3::DATE IS NULL OR weighing_date <= $3)) AS weighings
            "#,
        )
            .bind(lot_id)
            .bind(start)
            .bind(end)
            .fetch_one(executor)
            .await?;
        Ok(totals)
    }

    /// Mortes por causa, com a perda estimada pelo custo por cabeça da compra do lote.
    pub async fn mortality_by_cause<'e, E>(
        &self,
        executor: E,
        lot_id: Option<Uuid>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<CauseTotals>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, CauseTotals>(
            r#"
            SELECT
                MIN(TRIM(m.cause)) AS cause,
                COUNT(*) AS events,
                SUM(m.quantity)::BIGINT AS deaths,
                COALESCE(SUM(m.quantity * ROUND(p.total_cost / NULLIF(p.initial_quantity, 0), 2)), 0) AS estimated_loss
            FROM lot_mortality_records m
            JOIN lots l ON l.id = m.lot_id
            LEFT JOIN cattle_purchases p ON p.id = l.purchase_id
            WHERE ($1::UUID IS NULL OR m.lot_id = $1)
              AND ($2::DATE IS NULL OR m.record_date >= $2)
              AND ($3::DATE IS NULL OR m.record_date <= $3)
            GROUP BY LOWER(TRIM(m.cause))
            ORDER BY deaths DESC, cause ASC
            "#,
        )
            .bind(lot_id)
            .bind(start)
            .bind(end)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }
}

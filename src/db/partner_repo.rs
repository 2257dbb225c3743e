// src/db/partner_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::map_constraint_error,
        error::{AppError, Resource},
    },
    models::partner::{Partner, PartnerData, PartnerFilter},
};

const PARTNER_COLUMNS: &str = "id, name, partner_type, cpf_cnpj, phone, email, address, notes, is_active, created_at, updated_at";

fn map_partner_error(e: sqlx::Error, cpf_cnpj: Option<&str>) -> AppError {
    map_constraint_error(
        e,
        |_| AppError::DuplicateValue {
            field: "cpfCnpj",
            value: cpf_cnpj.unwrap_or_default().to_string(),
        },
        |_| AppError::ResourceInUse(Resource::Partner),
    )
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PartnerFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(partner_type) = filter.partner_type {
        qb.push(" AND partner_type = ").push_bind(partner_type);
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR cpf_cnpj ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[derive(Clone, Default)]
pub struct PartnerRepository;

impl PartnerRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &PartnerFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Partner>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(format!("SELECT {PARTNER_COLUMNS} FROM partners"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let partners = qb.build_query_as::<Partner>().fetch_all(executor).await?;
        Ok(partners)
    }

    pub async fn count<'e, E>(&self, executor: E, filter: &PartnerFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM partners");
        push_filters(&mut qb, filter);

        let total: i64 = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Partner>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let partner = sqlx::query_as::<_, Partner>(&format!(
            "SELECT {PARTNER_COLUMNS} FROM partners WHERE id = $1"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(partner)
    }

    pub async fn create<'e, E>(&self, executor: E, data: &PartnerData) -> Result<Partner, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Partner>(&format!(
            r#"
            INSERT INTO partners (name, partner_type, cpf_cnpj, phone, email, address, notes, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PARTNER_COLUMNS}
            "#
        ))
            .bind(&data.name)
            .bind(data.partner_type)
            .bind(&data.cpf_cnpj)
            .bind(&data.phone)
            .bind(&data.email)
            .bind(&data.address)
            .bind(&data.notes)
            .bind(data.is_active)
            .fetch_one(executor)
            .await
            .map_err(|e| map_partner_error(e, data.cpf_cnpj.as_deref()))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        data: &PartnerData,
    ) -> Result<Option<Partner>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Partner>(&format!(
            r#"
            UPDATE partners SET
                name = $2, partner_type = $3, cpf_cnpj = $4, phone = $5,
                email = $6, address = $7, notes = $8, is_active = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PARTNER_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(&data.name)
            .bind(data.partner_type)
            .bind(&data.cpf_cnpj)
            .bind(&data.phone)
            .bind(&data.email)
            .bind(&data.address)
            .bind(&data.notes)
            .bind(data.is_active)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_partner_error(e, data.cpf_cnpj.as_deref()))
    }

    /// Remove o parceiro. Retorna `false` se ele não existia.
    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM partners WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_partner_error(e, None))?;
        Ok(result.rows_affected() > 0)
    }
}

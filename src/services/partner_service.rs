// src/services/partner_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::{AppError, Resource},
        pagination::{Paginated, PaginationParams},
    },
    db::PartnerRepository,
    models::partner::{Partner, PartnerData, PartnerFilter},
};

#[derive(Clone)]
pub struct PartnerService {
    repo: PartnerRepository,
    pool: PgPool,
}

impl PartnerService {
    pub fn new(repo: PartnerRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn list(
        &self,
        filter: &PartnerFilter,
        paging: &PaginationParams,
    ) -> Result<Paginated<Partner>, AppError> {
        let items = self.repo
            .list(&self.pool, filter, paging.limit(), paging.offset())
            .await?;
        let total = self.repo.count(&self.pool, filter).await?;
        Ok(Paginated::new(items, total, paging))
    }

    pub async fn get(&self, id: Uuid) -> Result<Partner, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Partner))
    }

    pub async fn create(&self, data: PartnerData) -> Result<Partner, AppError> {
        let partner = self.repo.create(&self.pool, &normalize(data)).await?;
        tracing::info!(partner_id = %partner.id, "Parceiro cadastrado");
        Ok(partner)
    }

    pub async fn update(&self, id: Uuid, data: PartnerData) -> Result<Partner, AppError> {
        self.repo
            .update(&self.pool, id, &normalize(data))
            .await?
            .ok_or(AppError::NotFound(Resource::Partner))
    }

    /// Parceiros vinculados a compras ou vendas não podem ser removidos (409).
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(&self.pool, id).await? {
            return Err(AppError::NotFound(Resource::Partner));
        }
        Ok(())
    }
}

// CPF/CNPJ vazio vira NULL para não colidir na constraint UNIQUE
fn normalize(mut data: PartnerData) -> PartnerData {
    data.name = data.name.trim().to_string();
    data.cpf_cnpj = data
        .cpf_cnpj
        .map(|doc| doc.trim().to_string())
        .filter(|doc| !doc.is_empty());
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::partner::PartnerType;

    #[test]
    fn blank_document_is_stored_as_null() {
        let data = normalize(PartnerData {
            name: "  Frigorífico Boi Gordo ".into(),
            partner_type: PartnerType::Buyer,
            cpf_cnpj: Some("   ".into()),
            phone: None,
            email: None,
            address: None,
            notes: None,
            is_active: true,
        });

        assert_eq!(data.name, "Frigorífico Boi Gordo");
        assert_eq!(data.cpf_cnpj, None);
    }
}

// src/services/pen_service.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::{AppError, BusinessRule, Resource},
    db::{LotRepository, PenRepository},
    models::{
        lot::{MovementType, NewMovement},
        pen::{AllocationStatus, Pen, PenAllocation, PenData, PenOccupancy, PenStatus},
    },
};

#[derive(Clone)]
pub struct PenService {
    repo: PenRepository,
    lot_repo: LotRepository,
    pool: PgPool,
}

impl PenService {
    pub fn new(repo: PenRepository, lot_repo: LotRepository, pool: PgPool) -> Self {
        Self { repo, lot_repo, pool }
    }

    pub async fn list(&self, status: Option<PenStatus>) -> Result<Vec<Pen>, AppError> {
        self.repo.list(&self.pool, status).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Pen, AppError> {
        self.repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Pen))
    }

    pub async fn create(&self, data: PenData) -> Result<Pen, AppError> {
        let pen = self.repo.create(&self.pool, &data).await?;
        tracing::info!(pen_id = %pen.id, capacity = pen.capacity, "Curral cadastrado");
        Ok(pen)
    }

    /// Não deixa a capacidade ficar abaixo da ocupação nem isola um curral com animais.
    pub async fn update(&self, id: Uuid, mut data: PenData) -> Result<Pen, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Pen))?;
        let occupied = self.repo.occupied(&mut *tx, id).await?;

        check_update(&data, occupied)?;

        // OCCUPIED/AVAILABLE acompanham a ocupação real
        if data.status.accepts_animals() {
            let base = if current.status.accepts_animals() { current.status } else { PenStatus::Available };
            data.status = base.after_occupancy_change(data.capacity, occupied);
        }

        let pen = self.repo
            .update(&mut *tx, id, &data)
            .await?
            .ok_or(AppError::NotFound(Resource::Pen))?;

        tx.commit().await?;
        Ok(pen)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Pen))?;

        if self.repo.occupied(&mut *tx, id).await? > 0 {
            return Err(BusinessRule::PenNotEmpty.into());
        }

        self.repo.delete(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn occupancy(&self, id: Uuid) -> Result<PenOccupancy, AppError> {
        let pen = self.get(id).await?;
        let allocations = self.repo.active_allocations(&self.pool, id).await?;
        let occupied: i64 = allocations.iter().map(|a| a.quantity as i64).sum();

        Ok(PenOccupancy {
            pen_id: pen.id,
            capacity: pen.capacity,
            occupied,
            available: (pen.capacity as i64 - occupied).max(0),
            occupancy_rate: occupancy_rate(pen.capacity, occupied),
            allocations,
        })
    }

    /// Aloca cabeças de um lote no curral.
    ///
    /// A linha do curral fica travada (`FOR UPDATE`) durante a checagem de capacidade,
    /// então duas alocações simultâneas nunca ultrapassam o limite.
    pub async fn allocate(
        &self,
        pen_id: Uuid,
        lot_id: Uuid,
        quantity: i32,
        user_id: Option<Uuid>,
    ) -> Result<PenAllocation, AppError> {
        let mut tx = self.pool.begin().await?;

        // Ordem de travas: lote, currais (por id), alocações
        let lot = self.lot_repo
            .find_by_id_for_update(&mut *tx, lot_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Lot))?;
        let pen = self.repo
            .find_by_id_for_update(&mut *tx, pen_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Pen))?;

        let occupied = self.repo.occupied(&mut *tx, pen_id).await?;
        let lot_allocated = self.lot_repo.allocated_quantity(&mut *tx, lot_id).await?;
        let unallocated = lot.current_quantity as i64 - lot_allocated;

        check_allocation(&pen, occupied, quantity as i64, unallocated)?;

        let allocation = self.repo.create_allocation(&mut *tx, pen_id, lot_id, quantity).await?;
        self.lot_repo.set_pen(&mut *tx, lot_id, Some(pen_id)).await?;
        self.lot_repo
            .create_movement(
                &mut *tx,
                &NewMovement {
                    lot_id,
                    movement_type: MovementType::Allocation,
                    from_pen_id: None,
                    to_pen_id: Some(pen_id),
                    quantity,
                    reason: None,
                    user_id,
                },
            )
            .await?;
        sync_pen_status(&self.repo, &mut tx, pen_id).await?;

        tx.commit().await?;

        tracing::info!(
            pen_id = %pen_id,
            lot_id = %lot_id,
            quantity,
            occupied = occupied + quantity as i64,
            capacity = pen.capacity,
            "Lote alocado no curral"
        );
        Ok(allocation)
    }

    pub async fn release(
        &self,
        pen_id: Uuid,
        allocation_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<PenAllocation, AppError> {
        let mut tx = self.pool.begin().await?;

        let lot_id = self.repo
            .find_allocation(&mut *tx, pen_id, allocation_id)
            .await?
            .map(|a| a.lot_id)
            .ok_or(AppError::NotFound(Resource::PenAllocation))?;

        // Mesma ordem de travas da alocação: lote e depois curral
        self.lot_repo.find_by_id_for_update(&mut *tx, lot_id).await?;
        self.repo
            .find_by_id_for_update(&mut *tx, pen_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Pen))?;

        let allocation = self.repo
            .find_allocation(&mut *tx, pen_id, allocation_id)
            .await?
            .filter(|a| a.status == AllocationStatus::Active)
            .ok_or(AppError::NotFound(Resource::PenAllocation))?;

        let released = self.repo.release_allocation(&mut *tx, allocation_id).await?;
        self.lot_repo
            .create_movement(
                &mut *tx,
                &NewMovement {
                    lot_id: allocation.lot_id,
                    movement_type: MovementType::Release,
                    from_pen_id: Some(pen_id),
                    to_pen_id: None,
                    quantity: allocation.quantity,
                    reason: None,
                    user_id,
                },
            )
            .await?;

        refresh_lot_pen(&self.repo, &self.lot_repo, &mut tx, allocation.lot_id).await?;
        sync_pen_status(&self.repo, &mut tx, pen_id).await?;

        tx.commit().await?;

        tracing::info!(pen_id = %pen_id, allocation_id = %allocation_id, "Alocação liberada");
        Ok(released)
    }
}

pub(crate) fn check_update(data: &PenData, occupied: i64) -> Result<(), AppError> {
    if (data.capacity as i64) < occupied {
        return Err(BusinessRule::CapacityBelowOccupancy { capacity: data.capacity, occupied }.into());
    }
    if !data.status.accepts_animals() && occupied > 0 {
        return Err(BusinessRule::PenNotEmpty.into());
    }
    Ok(())
}

pub(crate) fn check_allocation(pen: &Pen, occupied: i64, requested: i64, lot_unallocated: i64) -> Result<(), AppError> {
    if !pen.status.accepts_animals() || !pen.is_active {
        return Err(BusinessRule::PenUnavailable.into());
    }
    let available = (pen.capacity as i64 - occupied).max(0);
    if requested > available {
        return Err(BusinessRule::PenCapacityExceeded { available, requested }.into());
    }
    if requested > lot_unallocated {
        return Err(BusinessRule::InsufficientAnimals { available: lot_unallocated.max(0), requested }.into());
    }
    Ok(())
}

pub(crate) fn occupancy_rate(capacity: i32, occupied: i64) -> Decimal {
    if capacity <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(occupied) / Decimal::from(capacity) * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Ajusta OCCUPIED/AVAILABLE conforme a ocupação atual.
pub(crate) async fn sync_pen_status(
    repo: &PenRepository,
    conn: &mut PgConnection,
    pen_id: Uuid,
) -> Result<(), AppError> {
    let Some(pen) = repo.find_by_id(&mut *conn, pen_id).await? else {
        return Ok(());
    };
    let occupied = repo.occupied(&mut *conn, pen_id).await?;
    let next = pen.status.after_occupancy_change(pen.capacity, occupied);
    if next != pen.status {
        repo.set_status(&mut *conn, pen_id, next).await?;
    }
    Ok(())
}

/// O curral principal do lote passa a ser um onde ele ainda tem animais (ou nenhum).
pub(crate) async fn refresh_lot_pen(
    repo: &PenRepository,
    lot_repo: &LotRepository,
    conn: &mut PgConnection,
    lot_id: Uuid,
) -> Result<(), AppError> {
    let pens = repo.pens_of_lot(&mut *conn, lot_id).await?;
    let current = lot_repo.find_by_id(&mut *conn, lot_id).await?.and_then(|lot| lot.pen_id);

    let next = match current {
        Some(pen_id) if pens.contains(&pen_id) => Some(pen_id),
        _ => pens.first().copied(),
    };
    if next != current {
        lot_repo.set_pen(&mut *conn, lot_id, next).await?;
    }
    Ok(())
}

/// Quanto tirar de cada alocação para que o total caia em `excess` cabeças.
/// Retorna `(allocation_id, nova_quantidade)`; zero significa liberar.
pub(crate) fn plan_shrink(allocations: &[PenAllocation], excess: i64) -> Vec<(Uuid, i32)> {
    let mut remaining = excess;
    let mut plan = Vec::new();
    for allocation in allocations {
        if remaining <= 0 {
            break;
        }
        let take = remaining.min(allocation.quantity as i64);
        plan.push((allocation.id, allocation.quantity - take as i32));
        remaining -= take;
    }
    plan
}

/// Reduz as alocações de um lote quando ele perde animais (morte ou venda).
///
/// Espera o lote já travado pela transação; os currais são atualizados em ordem de id.
pub(crate) async fn shrink_lot_allocations(
    repo: &PenRepository,
    lot_repo: &LotRepository,
    conn: &mut PgConnection,
    lot_id: Uuid,
    remaining_quantity: i32,
) -> Result<(), AppError> {
    let allocations = repo.lot_allocations(&mut *conn, lot_id).await?;
    let allocated: i64 = allocations.iter().map(|a| a.quantity as i64).sum();
    let excess = allocated - remaining_quantity as i64;
    if excess <= 0 {
        return Ok(());
    }

    // Currais travados por id antes de mexer nas alocações
    let mut touched: Vec<Uuid> = allocations.iter().map(|a| a.pen_id).collect();
    touched.sort();
    touched.dedup();
    for pen_id in &touched {
        repo.find_by_id_for_update(&mut *conn, *pen_id).await?;
    }

    for (allocation_id, new_quantity) in plan_shrink(&allocations, excess) {
        if new_quantity == 0 {
            repo.release_allocation(&mut *conn, allocation_id).await?;
        } else {
            repo.set_allocation_quantity(&mut *conn, allocation_id, new_quantity).await?;
        }
    }

    for pen_id in touched {
        sync_pen_status(repo, &mut *conn, pen_id).await?;
    }
    refresh_lot_pen(repo, lot_repo, &mut *conn, lot_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pen(capacity: i32, status: PenStatus) -> Pen {
        Pen {
            id: Uuid::new_v4(),
            name: "Curral 01".into(),
            capacity,
            location: None,
            status,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn allocation(quantity: i32) -> PenAllocation {
        PenAllocation {
            id: Uuid::new_v4(),
            pen_id: Uuid::new_v4(),
            lot_id: Uuid::new_v4(),
            quantity,
            status: AllocationStatus::Active,
            allocated_at: Utc::now(),
            released_at: None,
        }
    }

    #[test]
    fn allocation_beyond_capacity_is_rejected() {
        let pen = pen(100, PenStatus::Available);

        let err = check_allocation(&pen, 80, 30, 500).unwrap_err();

        assert!(matches!(
            err,
            AppError::BusinessRule(BusinessRule::PenCapacityExceeded { available: 20, requested: 30 })
        ));
    }

    #[test]
    fn allocation_filling_the_pen_exactly_is_accepted() {
        let pen = pen(100, PenStatus::Available);
        assert!(check_allocation(&pen, 80, 20, 20).is_ok());
    }

    #[test]
    fn pens_under_maintenance_do_not_receive_animals() {
        let pen = pen(100, PenStatus::Maintenance);
        let err = check_allocation(&pen, 0, 1, 10).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(BusinessRule::PenUnavailable)));
    }

    #[test]
    fn lot_cannot_allocate_more_than_it_has_free() {
        let pen = pen(100, PenStatus::Available);
        let err = check_allocation(&pen, 0, 40, 30).unwrap_err();
        assert!(matches!(
            err,
            AppError::BusinessRule(BusinessRule::InsufficientAnimals { available: 30, requested: 40 })
        ));
    }

    #[test]
    fn capacity_cannot_drop_below_occupancy() {
        let data = PenData {
            name: "Curral 01".into(),
            capacity: 40,
            location: None,
            status: PenStatus::Available,
            is_active: true,
        };
        assert!(matches!(
            check_update(&data, 50),
            Err(AppError::BusinessRule(BusinessRule::CapacityBelowOccupancy { capacity: 40, occupied: 50 }))
        ));
        assert!(check_update(&data, 40).is_ok());
    }

    #[test]
    fn quarantine_requires_an_empty_pen() {
        let data = PenData {
            name: "Curral 02".into(),
            capacity: 40,
            location: None,
            status: PenStatus::Quarantine,
            is_active: true,
        };
        assert!(check_update(&data, 1).is_err());
        assert!(check_update(&data, 0).is_ok());
    }

    #[test]
    fn occupancy_rate_is_a_percentage() {
        assert_eq!(occupancy_rate(120, 30), dec!(25));
        assert_eq!(occupancy_rate(3, 1), dec!(33.33));
    }

    #[test]
    fn shrink_plan_releases_whole_allocations_first() {
        let allocations = vec![allocation(5), allocation(10)];

        let plan = plan_shrink(&allocations, 8);

        assert_eq!(plan, vec![(allocations[0].id, 0), (allocations[1].id, 7)]);
    }
}

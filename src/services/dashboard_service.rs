// src/services/dashboard_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{DashboardRepository, FinanceRepository},
    models::{
        dashboard::{ActiveLotSnapshot, DashboardStats},
        finance::CashFlowSnapshot,
    },
    services::{
        finance_service::{build_cash_flow, ensure_business_dates, previous_period, resolve_period},
        lot_service::{average_daily_gain, days_on_feed, mortality_rate},
    },
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
    finance_repo: FinanceRepository,
    pool: PgPool,
}

/// Indicadores do rebanho calculados a partir dos lotes ativos.
#[derive(Debug, Clone, PartialEq)]
pub struct HerdIndicators {
    pub total_cattle: i64,
    pub active_lots: i64,
    pub average_weight: Decimal,
    pub mortality_rate: Decimal,
    pub performance_index: Decimal,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository, finance_repo: FinanceRepository, pool: PgPool) -> Self {
        Self { repo, finance_repo, pool }
    }

    pub async fn stats(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<DashboardStats, AppError> {
        ensure_business_dates(&[start, end])?;
        let today = Utc::now().date_naive();

        let lots = self.repo.active_lots(&self.pool).await?;
        let occupied_pens = self.repo.occupied_pens(&self.pool).await?;
        let total_revenue = self.finance_repo.total_revenue(&self.pool, start, end).await?;
        let total_expenses = self.finance_repo.total_expenses(&self.pool, start, end).await?;
        let cash_flow = self.current_month_cash_flow(today).await?;

        let herd = herd_indicators(&lots, today);

        Ok(DashboardStats {
            total_cattle: herd.total_cattle,
            active_lots: herd.active_lots,
            occupied_pens,
            total_revenue,
            total_expenses,
            net_profit: total_revenue - total_expenses,
            average_weight: herd.average_weight,
            mortality_rate: herd.mortality_rate,
            cash_flow,
            performance_index: herd.performance_index,
        })
    }

    async fn current_month_cash_flow(&self, today: NaiveDate) -> Result<CashFlowSnapshot, AppError> {
        let (start, end) = resolve_period(None, None, today)?;
        let (previous_start, previous_end) = previous_period(start, end)?;

        let totals = self.finance_repo.cash_totals(&self.pool, start, end).await?;
        let previous = self.finance_repo.cash_totals(&self.pool, previous_start, previous_end).await?;
        let months = self.finance_repo.monthly_cash(&self.pool, start, end).await?;

        Ok(build_cash_flow(start, end, &totals, &previous, &months))
    }
}

pub fn herd_indicators(lots: &[ActiveLotSnapshot], today: NaiveDate) -> HerdIndicators {
    let total_cattle: i64 = lots.iter().map(|l| l.current_quantity as i64).sum();
    let expected: i64 = lots.iter().map(|l| l.expected_animals as i64).sum();
    let deaths: i64 = lots.iter().map(|l| l.total_deaths).sum();

    // Média ponderada pelo número de cabeças de cada lote
    let average_weight = if total_cattle > 0 {
        let weighted: Decimal = lots
            .iter()
            .map(|l| l.latest_weight.unwrap_or(l.initial_weight) * Decimal::from(l.current_quantity))
            .sum();
        (weighted / Decimal::from(total_cattle)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let gains: Vec<Decimal> = lots
        .iter()
        .filter_map(|l| {
            l.latest_weight.map(|weight| {
                average_daily_gain(l.initial_weight, weight, days_on_feed(l.entry_date, today))
            })
        })
        .collect();
    let performance_index = if gains.is_empty() {
        Decimal::ZERO
    } else {
        (gains.iter().copied().sum::<Decimal>() / Decimal::from(gains.len() as i64)).round_dp(3)
    };

    HerdIndicators {
        total_cattle,
        active_lots: lots.len() as i64,
        average_weight,
        mortality_rate: mortality_rate(deaths, expected),
        performance_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(quantity: i32, initial: Decimal, latest: Option<Decimal>, deaths: i64) -> ActiveLotSnapshot {
        ActiveLotSnapshot {
            current_quantity: quantity,
            expected_animals: quantity + deaths as i32,
            initial_weight: initial,
            entry_date: date(2025, 1, 1),
            latest_weight: latest,
            total_deaths: deaths,
        }
    }

    #[test]
    fn average_weight_is_weighted_by_head_count() {
        let lots = vec![
            snapshot(100, dec!(300), Some(dec!(400)), 0),
            snapshot(300, dec!(300), None, 0),
        ];
        let herd = herd_indicators(&lots, date(2025, 3, 2));

        assert_eq!(herd.total_cattle, 400);
        assert_eq!(herd.active_lots, 2);
        // (100 × 400 + 300 × 300) / 400
        assert_eq!(herd.average_weight, dec!(325));
    }

    #[test]
    fn performance_index_ignores_lots_never_weighed() {
        let lots = vec![
            snapshot(50, dec!(300), Some(dec!(390)), 0),
            snapshot(50, dec!(300), None, 0),
        ];
        // 60 dias, 90 kg de ganho
        let herd = herd_indicators(&lots, date(2025, 3, 2));
        assert_eq!(herd.performance_index, dec!(1.5));
    }

    #[test]
    fn mortality_is_relative_to_expected_animals() {
        let lots = vec![snapshot(98, dec!(300), None, 2)];
        let herd = herd_indicators(&lots, date(2025, 3, 2));
        assert_eq!(herd.mortality_rate, dec!(2));
    }

    #[test]
    fn empty_herd_has_zeroed_indicators() {
        let herd = herd_indicators(&[], date(2025, 3, 2));
        assert_eq!(herd.total_cattle, 0);
        assert_eq!(herd.average_weight, Decimal::ZERO);
        assert_eq!(herd.performance_index, Decimal::ZERO);
        assert_eq!(herd.mortality_rate, Decimal::ZERO);
    }
}

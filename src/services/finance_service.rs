// src/services/finance_service.rs

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::{AppError, BusinessRule, Resource},
        pagination::{Paginated, PaginationParams},
        validation::is_business_date,
    },
    db::FinanceRepository,
    models::finance::{
        expense_group, is_revenue_category, CashFlowPeriod, CashFlowSnapshot, CashFlowTrend,
        CashTotals, CategoryAmount, DreStatement, Expense, ExpenseGroup, FinanceFilter, MonthlyCash,
        NewExpense, NewRevenue, PayerAccount, Revenue,
    },
};

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
    pool: PgPool,
}

impl FinanceService {
    pub fn new(repo: FinanceRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    // =========================================================================
    //  CONTAS PAGADORAS
    // =========================================================================

    pub async fn create_account(
        &self,
        name: &str,
        bank_name: Option<&str>,
        agency: Option<&str>,
        account_number: Option<&str>,
        initial_balance: Decimal,
    ) -> Result<PayerAccount, AppError> {
        self.repo
            .create_account(&self.pool, name.trim(), bank_name, agency, account_number, initial_balance)
            .await
    }

    pub async fn list_accounts(&self) -> Result<Vec<PayerAccount>, AppError> {
        self.repo.get_all_accounts(&self.pool).await
    }

    pub async fn get_account(&self, id: Uuid) -> Result<PayerAccount, AppError> {
        self.repo
            .find_account(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::PayerAccount))
    }

    // =========================================================================
    //  DESPESAS
    // =========================================================================

    pub async fn list_expenses(
        &self,
        filter: &FinanceFilter,
        paging: &PaginationParams,
    ) -> Result<Paginated<Expense>, AppError> {
        let items = self.repo
            .list_expenses(&self.pool, filter, paging.limit(), paging.offset())
            .await?;
        let total = self.repo.count_expenses(&self.pool, filter).await?;
        Ok(Paginated::new(items, total, paging))
    }

    pub async fn get_expense(&self, id: Uuid) -> Result<Expense, AppError> {
        self.repo
            .find_expense(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Expense))
    }

    pub async fn create_expense(&self, expense: NewExpense) -> Result<Expense, AppError> {
        ensure_expense_category(&expense.category)?;
        self.repo.create_expense(&self.pool, &expense).await
    }

    /// Despesas já pagas ficam travadas.
    pub async fn update_expense(&self, id: Uuid, expense: NewExpense) -> Result<Expense, AppError> {
        ensure_expense_category(&expense.category)?;

        let mut tx = self.pool.begin().await?;

        let current = self.repo
            .find_expense_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Expense))?;
        if current.is_paid {
            return Err(BusinessRule::SettledRecordLocked.into());
        }

        let updated = self.repo
            .update_expense(&mut *tx, id, &expense)
            .await?
            .ok_or(AppError::NotFound(Resource::Expense))?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_expense(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.repo
            .find_expense_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Expense))?;
        if current.is_paid {
            return Err(BusinessRule::SettledRecordLocked.into());
        }

        self.repo.delete_expense(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Baixa a despesa e debita a conta pagadora, na mesma transação.
    pub async fn pay_expense(
        &self,
        id: Uuid,
        payment_date: Option<NaiveDate>,
        payer_account_id: Option<Uuid>,
    ) -> Result<Expense, AppError> {
        let mut tx = self.pool.begin().await?;

        let expense = self.repo
            .find_expense_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Expense))?;

        if expense.is_paid {
            return Err(BusinessRule::AlreadyPaid.into());
        }
        if !expense.impacts_cash_flow {
            return Err(BusinessRule::NonCashExpense.into());
        }
        let account_id = payer_account_id
            .or(expense.payer_account_id)
            .ok_or(BusinessRule::PayerAccountRequired)?;

        self.repo
            .adjust_balance(&mut *tx, account_id, -expense.total_amount)
            .await?
            .ok_or(AppError::InvalidReference("payerAccountId"))?;

        let paid = self.repo
            .mark_expense_paid(
                &mut *tx,
                id,
                payment_date.unwrap_or_else(|| Utc::now().date_naive()),
                account_id,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(expense_id = %paid.id, amount = %paid.total_amount, "Despesa paga");
        Ok(paid)
    }

    // =========================================================================
    //  RECEITAS
    // =========================================================================

    pub async fn list_revenues(
        &self,
        filter: &FinanceFilter,
        paging: &PaginationParams,
    ) -> Result<Paginated<Revenue>, AppError> {
        let items = self.repo
            .list_revenues(&self.pool, filter, paging.limit(), paging.offset())
            .await?;
        let total = self.repo.count_revenues(&self.pool, filter).await?;
        Ok(Paginated::new(items, total, paging))
    }

    pub async fn get_revenue(&self, id: Uuid) -> Result<Revenue, AppError> {
        self.repo
            .find_revenue(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Revenue))
    }

    pub async fn create_revenue(&self, revenue: NewRevenue) -> Result<Revenue, AppError> {
        ensure_revenue_category(&revenue.category)?;
        self.repo.create_revenue(&self.pool, &revenue).await
    }

    pub async fn update_revenue(&self, id: Uuid, revenue: NewRevenue) -> Result<Revenue, AppError> {
        ensure_revenue_category(&revenue.category)?;

        let mut tx = self.pool.begin().await?;

        let current = self.repo
            .find_revenue_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Revenue))?;
        if current.is_received {
            return Err(BusinessRule::SettledRecordLocked.into());
        }

        let updated = self.repo
            .update_revenue(&mut *tx, id, &revenue)
            .await?
            .ok_or(AppError::NotFound(Resource::Revenue))?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_revenue(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self.repo
            .find_revenue_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Revenue))?;
        if current.is_received {
            return Err(BusinessRule::SettledRecordLocked.into());
        }

        self.repo.delete_revenue(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Baixa a receita e credita a conta, na mesma transação.
    pub async fn receive_revenue(
        &self,
        id: Uuid,
        receipt_date: Option<NaiveDate>,
        payer_account_id: Option<Uuid>,
    ) -> Result<Revenue, AppError> {
        let mut tx = self.pool.begin().await?;

        let revenue = self.repo
            .find_revenue_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Revenue))?;

        if revenue.is_received {
            return Err(BusinessRule::AlreadyReceived.into());
        }
        let account_id = payer_account_id
            .or(revenue.payer_account_id)
            .ok_or(BusinessRule::PayerAccountRequired)?;

        self.repo
            .adjust_balance(&mut *tx, account_id, revenue.total_amount)
            .await?
            .ok_or(AppError::InvalidReference("payerAccountId"))?;

        let received = self.repo
            .mark_revenue_received(
                &mut *tx,
                id,
                receipt_date.unwrap_or_else(|| Utc::now().date_naive()),
                account_id,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(revenue_id = %received.id, amount = %received.total_amount, "Receita recebida");
        Ok(received)
    }

    // =========================================================================
    //  FLUXO DE CAIXA / DRE
    // =========================================================================

    /// Sem datas, usa o mês corrente.
    pub async fn cash_flow(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<CashFlowSnapshot, AppError> {
        let (start, end) = resolve_period(start, end, Utc::now().date_naive())?;
        let (previous_start, previous_end) = previous_period(start, end)?;

        let totals = self.repo.cash_totals(&self.pool, start, end).await?;
        let previous = self.repo.cash_totals(&self.pool, previous_start, previous_end).await?;
        let months = self.repo.monthly_cash(&self.pool, start, end).await?;

        Ok(build_cash_flow(start, end, &totals, &previous, &months))
    }

    pub async fn dre(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<DreStatement, AppError> {
        let (start, end) = resolve_period(start, end, Utc::now().date_naive())?;

        let revenues = self.repo.revenues_by_category(&self.pool, start, end).await?;
        let expenses = self.repo.expenses_by_category(&self.pool, start, end).await?;

        Ok(build_dre(start, end, revenues, &expenses))
    }
}

pub(crate) fn ensure_expense_category(category: &str) -> Result<(), AppError> {
    match expense_group(category) {
        Some(_) => Ok(()),
        None => Err(BusinessRule::InvalidCategory(category.to_string()).into()),
    }
}

pub(crate) fn ensure_revenue_category(category: &str) -> Result<(), AppError> {
    if is_revenue_category(category) {
        Ok(())
    } else {
        Err(BusinessRule::InvalidCategory(category.to_string()).into())
    }
}

/// Maior período aceito nos relatórios, em dias (10 anos).
pub(crate) const MAX_PERIOD_DAYS: i64 = 3_660;

/// Filtros de data fora dos anos suportados viram erro de negócio.
pub(crate) fn ensure_business_dates(dates: &[Option<NaiveDate>]) -> Result<(), AppError> {
    if dates.iter().flatten().all(is_business_date) {
        Ok(())
    } else {
        Err(BusinessRule::InvalidPeriod.into())
    }
}

/// Completa o período: início padrão no dia 1 do mês, fim padrão no último dia.
pub(crate) fn resolve_period(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    ensure_business_dates(&[start, end])?;

    let reference = start.or(end).unwrap_or(today);
    let month_start = reference.with_day(1).unwrap_or(reference);
    let month_end = last_day_of_month(reference);

    let start = start.unwrap_or(month_start);
    let end = end.unwrap_or(month_end);
    let (start, end) = if end < start { (end, start) } else { (start, end) };

    if (end - start).num_days() > MAX_PERIOD_DAYS {
        return Err(BusinessRule::InvalidPeriod.into());
    }
    Ok((start, end))
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Período imediatamente anterior, com o mesmo número de dias.
pub(crate) fn previous_period(start: NaiveDate, end: NaiveDate) -> Result<(NaiveDate, NaiveDate), AppError> {
    let length = end.signed_duration_since(start);
    start
        .pred_opt()
        .and_then(|previous_end| previous_end.checked_sub_signed(length).map(|previous_start| (previous_start, previous_end)))
        .ok_or_else(|| BusinessRule::InvalidPeriod.into())
}

pub(crate) fn trend(current: Decimal, previous: Decimal) -> CashFlowTrend {
    match current.cmp(&previous) {
        std::cmp::Ordering::Greater => CashFlowTrend::Up,
        std::cmp::Ordering::Less => CashFlowTrend::Down,
        std::cmp::Ordering::Equal => CashFlowTrend::Stable,
    }
}

/// Rótulos `YYYY-MM` de todos os meses tocados pelo período.
fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut months = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        months.push(format!("{year:04}-{month:02}"));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

pub(crate) fn build_cash_flow(
    start: NaiveDate,
    end: NaiveDate,
    totals: &CashTotals,
    previous: &CashTotals,
    months: &[MonthlyCash],
) -> CashFlowSnapshot {
    let balance = totals.inflow - totals.outflow;
    let previous_balance = previous.inflow - previous.outflow;

    let periods = months_between(start, end)
        .into_iter()
        .map(|label| {
            let (inflow, outflow) = months
                .iter()
                .find(|m| m.month == label)
                .map(|m| (m.inflow, m.outflow))
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            CashFlowPeriod { month: label, inflow, outflow, balance: inflow - outflow }
        })
        .collect();

    CashFlowSnapshot {
        period_start: start,
        period_end: end,
        inflow: totals.inflow,
        outflow: totals.outflow,
        balance,
        pending_inflow: totals.pending_inflow,
        pending_outflow: totals.pending_outflow,
        previous_balance,
        trend: trend(balance, previous_balance),
        periods,
    }
}

pub(crate) fn build_dre(
    start: NaiveDate,
    end: NaiveDate,
    revenues: Vec<CategoryAmount>,
    expenses: &[CategoryAmount],
) -> DreStatement {
    let gross_revenue: Decimal = revenues.iter().map(|r| r.amount).sum();

    let mut acquisition_costs = Decimal::ZERO;
    let mut operational_expenses = Decimal::ZERO;
    let mut administrative_expenses = Decimal::ZERO;
    let mut financial_expenses = Decimal::ZERO;

    for expense in expenses {
        match expense_group(&expense.category) {
            Some(ExpenseGroup::Acquisition) => acquisition_costs += expense.amount,
            Some(ExpenseGroup::Operational) => operational_expenses += expense.amount,
            Some(ExpenseGroup::Administrative) => administrative_expenses += expense.amount,
            Some(ExpenseGroup::Financial) => financial_expenses += expense.amount,
            None => tracing::warn!(category = %expense.category, "Categoria de despesa fora do DRE"),
        }
    }

    let gross_profit = gross_revenue - acquisition_costs;
    let operating_result = gross_profit - operational_expenses - administrative_expenses;
    let net_result = operating_result - financial_expenses;
    let net_margin = if gross_revenue.is_zero() {
        Decimal::ZERO
    } else {
        (net_result / gross_revenue * Decimal::ONE_HUNDRED).round_dp(2)
    };

    DreStatement {
        period_start: start,
        period_end: end,
        revenues,
        gross_revenue,
        acquisition_costs,
        gross_profit,
        operational_expenses,
        administrative_expenses,
        financial_expenses,
        operating_result,
        net_result,
        net_margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn amount(category: &str, value: Decimal) -> CategoryAmount {
        CategoryAmount { category: category.to_string(), amount: value }
    }

    #[test]
    fn period_defaults_to_the_current_month() {
        let (start, end) = resolve_period(None, None, date(2024, 2, 17)).unwrap();
        assert_eq!(start, date(2024, 2, 1));
        assert_eq!(end, date(2024, 2, 29));
    }

    #[test]
    fn previous_period_has_the_same_length() {
        let (start, end) = previous_period(date(2025, 3, 1), date(2025, 3, 31)).unwrap();
        assert_eq!(end, date(2025, 2, 28));
        assert_eq!((end - start).num_days(), 30);
    }

    #[test]
    fn extreme_dates_are_rejected_instead_of_panicking() {
        let today = date(2025, 3, 10);
        assert!(matches!(
            resolve_period(Some(NaiveDate::MIN), Some(date(2025, 1, 1)), today),
            Err(AppError::BusinessRule(BusinessRule::InvalidPeriod))
        ));
        assert!(resolve_period(Some(date(1, 1, 1)), None, today).is_err());
        assert!(resolve_period(None, Some(NaiveDate::MAX), today).is_err());
        assert!(previous_period(NaiveDate::MIN, NaiveDate::MAX).is_err());
    }

    #[test]
    fn period_span_is_bounded() {
        let today = date(2025, 3, 10);
        assert!(resolve_period(Some(date(1900, 1, 1)), Some(date(9999, 12, 31)), today).is_err());
        let (start, end) = resolve_period(Some(date(2015, 1, 1)), Some(date(2024, 12, 31)), today).unwrap();
        assert_eq!(months_between(start, end).len(), 120);
    }

    #[test]
    fn cash_flow_balance_is_inflow_minus_outflow() {
        let totals = CashTotals {
            inflow: dec!(150000.00),
            outflow: dec!(92350.75),
            pending_inflow: dec!(10000),
            pending_outflow: dec!(2500),
        };
        let previous = CashTotals { inflow: dec!(1000), outflow: dec!(3000), ..Default::default() };
        let months = vec![MonthlyCash {
            month: "2025-03".into(),
            inflow: dec!(150000.00),
            outflow: dec!(92350.75),
        }];

        let snapshot = build_cash_flow(date(2025, 3, 1), date(2025, 3, 31), &totals, &previous, &months);

        assert_eq!(snapshot.balance, snapshot.inflow - snapshot.outflow);
        assert_eq!(snapshot.balance, dec!(57649.25));
        assert_eq!(snapshot.previous_balance, dec!(-2000));
        assert_eq!(snapshot.trend, CashFlowTrend::Up);
        assert_eq!(snapshot.periods.len(), 1);
        assert_eq!(snapshot.periods[0].balance, dec!(57649.25));
    }

    #[test]
    fn monthly_breakdown_fills_months_without_movement() {
        let totals = CashTotals::default();
        let months = vec![MonthlyCash { month: "2025-02".into(), inflow: dec!(10), outflow: dec!(4) }];

        let snapshot = build_cash_flow(date(2025, 1, 15), date(2025, 3, 10), &totals, &totals, &months);

        let labels: Vec<_> = snapshot.periods.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(labels, ["2025-01", "2025-02", "2025-03"]);
        assert_eq!(snapshot.periods[0].inflow, Decimal::ZERO);
        assert_eq!(snapshot.periods[1].balance, dec!(6));
        assert_eq!(snapshot.trend, CashFlowTrend::Stable);
    }

    #[test]
    fn dre_groups_expenses_by_catalogue() {
        let revenues = vec![amount("cattle_sales", dec!(200000)), amount("byproduct_sales", dec!(5000))];
        let expenses = vec![
            amount("animal_purchase", dec!(120000)),
            amount("freight", dec!(3000)),
            amount("feed", dec!(25000)),
            amount("deaths", dec!(2000)),
            amount("personnel", dec!(8000)),
            amount("interest", dec!(1500)),
        ];

        let dre = build_dre(date(2025, 1, 1), date(2025, 12, 31), revenues, &expenses);

        assert_eq!(dre.gross_revenue, dec!(205000));
        assert_eq!(dre.acquisition_costs, dec!(123000));
        assert_eq!(dre.gross_profit, dec!(82000));
        assert_eq!(dre.operational_expenses, dec!(27000));
        assert_eq!(dre.administrative_expenses, dec!(8000));
        assert_eq!(dre.financial_expenses, dec!(1500));
        assert_eq!(dre.operating_result, dec!(47000));
        assert_eq!(dre.net_result, dec!(45500));
        assert_eq!(dre.net_margin, dec!(22.20));
    }

    #[test]
    fn dre_margin_is_zero_without_revenue() {
        let dre = build_dre(date(2025, 1, 1), date(2025, 1, 31), vec![], &[amount("feed", dec!(100))]);
        assert_eq!(dre.net_result, dec!(-100));
        assert_eq!(dre.net_margin, Decimal::ZERO);
    }

    #[test]
    fn unknown_categories_are_rejected() {
        assert!(ensure_expense_category("feed").is_ok());
        assert!(ensure_expense_category("cattle_sales").is_err());
        assert!(ensure_revenue_category("cattle_sales").is_ok());
        assert!(matches!(
            ensure_revenue_category("bingo"),
            Err(AppError::BusinessRule(BusinessRule::InvalidCategory(_)))
        ));
    }
}

// src/db/finance_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_constraint_error, error::AppError},
    models::finance::{
        CashTotals, CategoryAmount, Expense, FinanceFilter, MonthlyCash, NewExpense, NewRevenue,
        PayerAccount, Revenue, PURCHASE_GENERATED_CATEGORIES,
    },
};

const ACCOUNT_COLUMNS: &str = "id, name, bank_name, agency, account_number, balance, is_active, created_at";

const EXPENSE_COLUMNS: &str = r#"
    id, category, description, total_amount, due_date, payment_date, is_paid,
    impacts_cash_flow, purchase_id, lot_id, vendor_id, payer_account_id, notes,
    user_id, created_at, updated_at
"#;

const REVENUE_COLUMNS: &str = r#"
    id, category, description, total_amount, due_date, receipt_date, is_received,
    sale_id, buyer_id, payer_account_id, notes, user_id, created_at, updated_at
"#;

// Os vínculos opcionais apontam para registros que precisam existir
fn map_link_error(e: sqlx::Error) -> AppError {
    map_constraint_error(
        e,
        |_| AppError::InvalidReference("id"),
        |constraint| {
            if constraint.contains("payer_account") {
                AppError::InvalidReference("payerAccountId")
            } else if constraint.contains("purchase") {
                AppError::InvalidReference("purchaseId")
            } else if constraint.contains("lot") {
                AppError::InvalidReference("lotId")
            } else if constraint.contains("vendor") {
                AppError::InvalidReference("vendorId")
            } else if constraint.contains("buyer") {
                AppError::InvalidReference("buyerId")
            } else if constraint.contains("sale") {
                AppError::InvalidReference("saleId")
            } else {
                AppError::InvalidReference("userId")
            }
        },
    )
}

/// `settled_column` é `is_paid` ou `is_received`.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &FinanceFilter, settled_column: &str) {
    qb.push(" WHERE 1 = 1");
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(settled) = filter.settled {
        qb.push(format!(" AND {settled_column} = ")).push_bind(settled);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND due_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND due_date <= ").push_bind(end);
    }
}

#[derive(Clone, Default)]
pub struct FinanceRepository;

impl FinanceRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CONTAS PAGADORAS (Caixa)
    // =========================================================================

    pub async fn create_account<'e, E>(
        &self,
        executor: E,
        name: &str,
        bank_name: Option<&str>,
        agency: Option<&str>,
        account_number: Option<&str>,
        initial_balance: Decimal,
    ) -> Result<PayerAccount, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account = sqlx::query_as::<_, PayerAccount>(&format!(
            r#"
            INSERT INTO payer_accounts (name, bank_name, agency, account_number, balance)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
            .bind(name)
            .bind(bank_name)
            .bind(agency)
            .bind(account_number)
            .bind(initial_balance)
            .fetch_one(executor)
            .await?;

        Ok(account)
    }

    pub async fn get_all_accounts<'e, E>(&self, executor: E) -> Result<Vec<PayerAccount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let accounts = sqlx::query_as::<_, PayerAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM payer_accounts ORDER BY name ASC"
        ))
            .fetch_all(executor)
            .await?;

        Ok(accounts)
    }

    pub async fn find_account<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<PayerAccount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account = sqlx::query_as::<_, PayerAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM payer_accounts WHERE id = $1"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(account)
    }

    /// Soma `delta` ao saldo (negativo para débitos). `None` se a conta não existe.
    pub async fn adjust_balance<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        delta: Decimal,
    ) -> Result<Option<PayerAccount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account = sqlx::query_as::<_, PayerAccount>(&format!(
            "UPDATE payer_accounts SET balance = balance + $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
            .bind(id)
            .bind(delta)
            .fetch_optional(executor)
            .await?;

        Ok(account)
    }

    // =========================================================================
    //  DESPESAS (Contas a Pagar)
    // =========================================================================

    pub async fn list_expenses<'e, E>(
        &self,
        executor: E,
        filter: &FinanceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Expense>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(format!("SELECT {EXPENSE_COLUMNS} FROM expenses"));
        push_filters(&mut qb, filter, "is_paid");
        qb.push(" ORDER BY due_date DESC, created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let expenses = qb.build_query_as::<Expense>().fetch_all(executor).await?;
        Ok(expenses)
    }

    pub async fn count_expenses<'e, E>(&self, executor: E, filter: &FinanceFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM expenses");
        push_filters(&mut qb, filter, "is_paid");
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn find_expense<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Expense>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expense = sqlx::query_as::<_, Expense>(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(expense)
    }

    pub async fn find_expense_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Expense>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 FOR UPDATE"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(expense)
    }

    pub async fn create_expense<'e, E>(&self, executor: E, expense: &NewExpense) -> Result<Expense, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses (
                category, description, total_amount, due_date, impacts_cash_flow,
                purchase_id, lot_id, vendor_id, payer_account_id, notes, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
            .bind(&expense.category)
            .bind(&expense.description)
            .bind(expense.total_amount)
            .bind(expense.due_date)
            .bind(expense.impacts_cash_flow)
            .bind(expense.purchase_id)
            .bind(expense.lot_id)
            .bind(expense.vendor_id)
            .bind(expense.payer_account_id)
            .bind(&expense.notes)
            .bind(expense.user_id)
            .fetch_one(executor)
            .await
            .map_err(map_link_error)
    }

    pub async fn update_expense<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expense: &NewExpense,
    ) -> Result<Option<Expense>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses SET
                category = $2, description = $3, total_amount = $4, due_date = $5,
                impacts_cash_flow = $6, purchase_id = $7, lot_id = $8, vendor_id = $9,
                payer_account_id = $10, notes = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(&expense.category)
            .bind(&expense.description)
            .bind(expense.total_amount)
            .bind(expense.due_date)
            .bind(expense.impacts_cash_flow)
            .bind(expense.purchase_id)
            .bind(expense.lot_id)
            .bind(expense.vendor_id)
            .bind(expense.payer_account_id)
            .bind(&expense.notes)
            .fetch_optional(executor)
            .await
            .map_err(map_link_error)
    }

    pub async fn mark_expense_paid<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payment_date: NaiveDate,
        payer_account_id: Uuid,
    ) -> Result<Expense, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses SET
                is_paid = TRUE, payment_date = $2, payer_account_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(payment_date)
            .bind(payer_account_id)
            .fetch_one(executor)
            .await?;
        Ok(expense)
    }

    pub async fn delete_expense<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Categorias de despesas da compra que já foram pagas.
    pub async fn paid_purchase_categories<'e, E>(&self, executor: E, purchase_id: Uuid) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM expenses WHERE purchase_id = $1 AND is_paid",
        )
            .bind(purchase_id)
            .fetch_all(executor)
            .await?;
        Ok(categories)
    }

    /// Remove as despesas de aquisição geradas pela compra que ainda estão em aberto.
    /// Lançamentos de outras categorias (ex: mortalidade) ficam intactos.
    pub async fn delete_unpaid_purchase_expenses<'e, E>(&self, executor: E, purchase_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM expenses WHERE purchase_id = $1 AND NOT is_paid AND category = ANY($2)",
        )
            .bind(purchase_id)
            .bind(PURCHASE_GENERATED_CATEGORIES)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  RECEITAS (Contas a Receber)
    // =========================================================================

    pub async fn list_revenues<'e, E>(
        &self,
        executor: E,
        filter: &FinanceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Revenue>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new(format!("SELECT {REVENUE_COLUMNS} FROM revenues"));
        push_filters(&mut qb, filter, "is_received");
        qb.push(" ORDER BY due_date DESC, created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let revenues = qb.build_query_as::<Revenue>().fetch_all(executor).await?;
        Ok(revenues)
    }

    pub async fn count_revenues<'e, E>(&self, executor: E, filter: &FinanceFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM revenues");
        push_filters(&mut qb, filter, "is_received");
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn find_revenue<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Revenue>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let revenue = sqlx::query_as::<_, Revenue>(&format!("SELECT {REVENUE_COLUMNS} FROM revenues WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(revenue)
    }

    pub async fn find_revenue_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Revenue>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let revenue = sqlx::query_as::<_, Revenue>(&format!(
            "SELECT {REVENUE_COLUMNS} FROM revenues WHERE id = $1 FOR UPDATE"
        ))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(revenue)
    }

    pub async fn create_revenue<'e, E>(&self, executor: E, revenue: &NewRevenue) -> Result<Revenue, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Revenue>(&format!(
            r#"
            INSERT INTO revenues (
                category, description, total_amount, due_date,
                sale_id, buyer_id, payer_account_id, notes, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {REVENUE_COLUMNS}
            "#
        ))
            .bind(&revenue.category)
            .bind(&revenue.description)
            .bind(revenue.total_amount)
            .bind(revenue.due_date)
            .bind(revenue.sale_id)
            .bind(revenue.buyer_id)
            .bind(revenue.payer_account_id)
            .bind(&revenue.notes)
            .bind(revenue.user_id)
            .fetch_one(executor)
            .await
            .map_err(map_link_error)
    }

    pub async fn update_revenue<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        revenue: &NewRevenue,
    ) -> Result<Option<Revenue>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Revenue>(&format!(
            r#"
            UPDATE revenues SET
                category = $2, description = $3, total_amount = $4, due_date = $5,
                sale_id = $6, buyer_id = $7, payer_account_id = $8, notes = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REVENUE_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(&revenue.category)
            .bind(&revenue.description)
            .bind(revenue.total_amount)
            .bind(revenue.due_date)
            .bind(revenue.sale_id)
            .bind(revenue.buyer_id)
            .bind(revenue.payer_account_id)
            .bind(&revenue.notes)
            .fetch_optional(executor)
            .await
            .map_err(map_link_error)
    }

    pub async fn mark_revenue_received<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        receipt_date: NaiveDate,
        payer_account_id: Uuid,
    ) -> Result<Revenue, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let revenue = sqlx::query_as::<_, Revenue>(&format!(
            r#"
            UPDATE revenues SET
                is_received = TRUE, receipt_date = $2, payer_account_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {REVENUE_COLUMNS}
            "#
        ))
            .bind(id)
            .bind(receipt_date)
            .bind(payer_account_id)
            .fetch_one(executor)
            .await?;
        Ok(revenue)
    }

    pub async fn delete_revenue<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM revenues WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  AGREGADOS (Fluxo de Caixa / DRE / Painel)
    // =========================================================================

    /// Realizado pela data de pagamento/recebimento, previsto pelo vencimento.
    pub async fn cash_totals<'e, E>(&self, executor: E, start: NaiveDate, end: NaiveDate) -> Result<CashTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, CashTotals>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(total_amount), 0) FROM revenues
                  WHERE is_received AND receipt_date BETWEEN $1 AND $2) AS inflow,
                (SELECT COALESCE(SUM(total_amount), 0) FROM expenses
                  WHERE is_paid AND impacts_cash_flow AND payment_date BETWEEN $1 AND $2) AS outflow,
                (SELECT COALESCE(SUM(total_amount), 0) FROM revenues
                  WHERE NOT is_received AND due_date BETWEEN $1 AND $2) AS pending_inflow,
                (SELECT COALESCE(SUM(total_amount), 0) FROM expenses
                  WHERE NOT is_paid AND impacts_cash_flow AND due_date BETWEEN $1 AND $2) AS pending_outflow
            "#,
        )
            .bind(start)
            .bind(end)
            .fetch_one(executor)
            .await?;
        Ok(totals)
    }

    /// Entradas e saídas realizadas, mês a mês.
    pub async fn monthly_cash<'e, E>(
        &self,
        executor: E,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MonthlyCash>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let months = sqlx::query_as::<_, MonthlyCash>(
            r#"
            SELECT month, COALESCE(SUM(inflow), 0) AS inflow, COALESCE(SUM(outflow), 0) AS outflow
            FROM (
                SELECT to_char(receipt_date, 'YYYY-MM') AS month, total_amount AS inflow, 0::NUMERIC AS outflow
                FROM revenues
                WHERE is_received AND receipt_date BETWEEN $1 AND $2
                UNION ALL
                SELECT to_char(payment_date, 'YYYY-MM'), 0::NUMERIC, total_amount
                FROM expenses
                WHERE is_paid AND impacts_cash_flow AND payment_date BETWEEN $1 AND $2
            ) movements
            GROUP BY month
            ORDER BY month ASC
            "#,
        )
            .bind(start)
            .bind(end)
            .fetch_all(executor)
            .await?;
        Ok(months)
    }

    /// Receitas por categoria, pela data de competência (vencimento).
    pub async fn revenues_by_category<'e, E>(
        &self,
        executor: E,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CategoryAmount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, CategoryAmount>(
            r#"
            SELECT category, COALESCE(SUM(total_amount), 0) AS amount
            FROM revenues
            WHERE due_date BETWEEN $1 AND $2
            GROUP BY category
            ORDER BY category
            "#,
        )
            .bind(start)
            .bind(end)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    /// Despesas por categoria, pela data de competência (vencimento).
    pub async fn expenses_by_category<'e, E>(
        &self,
        executor: E,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CategoryAmount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, CategoryAmount>(
            r#"
            SELECT category, COALESCE(SUM(total_amount), 0) AS amount
            FROM expenses
            WHERE due_date BETWEEN $1 AND $2
            GROUP BY category
            ORDER BY category
            "#,
        )
            .bind(start)
            .bind(end)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    /// Receita total lançada no período (tudo, quando sem datas).
    pub async fn total_revenue<'e, E>(
        &self,
        executor: E,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(total_amount), 0) FROM revenues
            WHERE ($1::DATE IS NULL OR due_date >= $1) AND ($2::DATE IS NULL OR due_date <= $2)
            "#,
        )
            .bind(start)
            .bind(end)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    pub async fn total_expenses<'e, E>(
        &self,
        executor: E,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(total_amount), 0) FROM expenses
            WHERE ($1::DATE IS NULL OR due_date >= $1) AND ($2::DATE IS NULL OR due_date <= $2)
            "#,
        )
            .bind(start)
            .bind(end)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }
}

// src/handlers/finance.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        pagination::{Paginated, PaginationParams},
        validation::{validate_business_date, validate_not_negative, validate_payload},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermDelete, PermFinance, PermWrite, RequirePermission},
    },
    models::finance::{
        impacts_cash_flow_by_default, CashFlowSnapshot, DreStatement, Expense, FinanceFilter, NewExpense,
        NewRevenue, PayerAccount, Revenue,
    },
};

// =========================================================================
//  CONTAS PAGADORAS
// =========================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayerAccountPayload {
    #[validate(length(min = 1, max = 120, message = "O nome da conta é obrigatório."))]
    #[schema(example = "Conta Principal")]
    pub name: String,
    pub bank_name: Option<String>,
    pub agency: Option<String>,
    pub account_number: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub initial_balance: Decimal,
}

#[utoipa::path(
    post,
    path = "/api/v1/payer-accounts",
    tag = "Finance",
    request_body = CreatePayerAccountPayload,
    responses(
        (status = 201, description = "Conta criada", body = PayerAccount),
        (status = 403, description = "Requer permissão financeira")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_payer_account(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFinance>,
    WithRejection(Json(payload), _): WithRejection<Json<CreatePayerAccountPayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let account = app_state
        .finance_service
        .create_account(
            &payload.name,
            payload.bank_name.as_deref(),
            payload.agency.as_deref(),
            payload.account_number.as_deref(),
            payload.initial_balance,
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    get,
    path = "/api/v1/payer-accounts",
    tag = "Finance",
    responses((status = 200, description = "Contas pagadoras", body = Vec<PayerAccount>)),
    security(("api_jwt" = []))
)]
pub async fn list_payer_accounts(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Json<Vec<PayerAccount>>, ApiError> {
    let accounts = app_state
        .finance_service
        .list_accounts()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(accounts))
}

#[utoipa::path(
    get,
    path = "/api/v1/payer-accounts/{id}",
    tag = "Finance",
    params(("id" = Uuid, Path, description = "ID da conta")),
    responses(
        (status = 200, description = "Conta pagadora", body = PayerAccount),
        (status = 404, description = "Conta não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_payer_account(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<PayerAccount>, ApiError> {
    let account = app_state
        .finance_service
        .get_account(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(account))
}

// =========================================================================
//  DESPESAS
// =========================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePayload {
    #[validate(required(message = "O campo 'category' é obrigatório."))]
    #[schema(example = "feed")]
    pub category: Option<String>,

    #[validate(
        required(message = "O campo 'description' é obrigatório."),
        length(min = 1, max = 255, message = "A descrição deve ter entre 1 e 255 caracteres.")
    )]
    pub description: Option<String>,

    #[validate(
        required(message = "O campo 'totalAmount' é obrigatório."),
        custom(function = "validate_not_negative")
    )]
    pub total_amount: Option<Decimal>,

    #[validate(
        required(message = "O campo 'dueDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub due_date: Option<NaiveDate>,

    /// Quando omitido, `deaths` e `weight_loss` assumem `false`
    pub impacts_cash_flow: Option<bool>,

    pub purchase_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub payer_account_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl ExpensePayload {
    fn into_new(self, user_id: Uuid) -> NewExpense {
        let category = self.category.unwrap_or_default();
        NewExpense {
            impacts_cash_flow: self
                .impacts_cash_flow
                .unwrap_or_else(|| impacts_cash_flow_by_default(&category)),
            category,
            description: self.description.unwrap_or_default(),
            total_amount: self.total_amount.unwrap_or_default(),
            due_date: self.due_date.unwrap_or_default(),
            purchase_id: self.purchase_id,
            lot_id: self.lot_id,
            vendor_id: self.vendor_id,
            payer_account_id: self.payer_account_id,
            notes: self.notes,
            user_id: Some(user_id),
        }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExpenseQuery {
    pub category: Option<String>,
    pub is_paid: Option<bool>,
    /// Vencimento a partir de
    #[validate(custom(function = "validate_business_date"))]
    pub start_date: Option<NaiveDate>,
    /// Vencimento até
    #[validate(custom(function = "validate_business_date"))]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlePayload {
    /// Padrão: hoje
    #[validate(custom(function = "validate_business_date"))]
    pub payment_date: Option<NaiveDate>,
    pub payer_account_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    tag = "Finance",
    params(ExpenseQuery, PaginationParams),
    responses((status = 200, description = "Despesas", body = Paginated<Expense>)),
    security(("api_jwt" = []))
)]
pub async fn list_expenses(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<ExpenseQuery>, AppError>,
    WithRejection(Query(paging), _): WithRejection<Query<PaginationParams>, AppError>,
) -> Result<Json<Paginated<Expense>>, ApiError> {
    validate_payload(&query, &locale)?;

    let filter = FinanceFilter {
        category: query.category,
        settled: query.is_paid,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let page = app_state
        .finance_service
        .list_expenses(&filter, &paging)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/expenses/{id}",
    tag = "Finance",
    params(("id" = Uuid, Path, description = "ID da despesa")),
    responses(
        (status = 200, description = "Despesa", body = Expense),
        (status = 404, description = "Despesa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Expense>, ApiError> {
    let expense = app_state
        .finance_service
        .get_expense(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(expense))
}

#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    tag = "Finance",
    request_body = ExpensePayload,
    responses(
        (status = 201, description = "Despesa lançada", body = Expense),
        (status = 400, description = "Dados inválidos ou categoria desconhecida")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Json(payload), _): WithRejection<Json<ExpensePayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let expense = app_state
        .finance_service
        .create_expense(payload.into_new(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(expense)))
}

#[utoipa::path(
    put,
    path = "/api/v1/expenses/{id}",
    tag = "Finance",
    request_body = ExpensePayload,
    params(("id" = Uuid, Path, description = "ID da despesa")),
    responses(
        (status = 200, description = "Despesa atualizada", body = Expense),
        (status = 400, description = "Despesa já paga")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<ExpensePayload>, AppError>,
) -> Result<Json<Expense>, ApiError> {
    validate_payload(&payload, &locale)?;

    let expense = app_state
        .finance_service
        .update_expense(id, payload.into_new(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(expense))
}

#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{id}",
    tag = "Finance",
    params(("id" = Uuid, Path, description = "ID da despesa")),
    responses(
        (status = 204, description = "Despesa removida"),
        (status = 400, description = "Despesa já paga"),
        (status = 404, description = "Despesa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDelete>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, ApiError> {
    app_state
        .finance_service
        .delete_expense(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/expenses/{id}/pay",
    tag = "Finance",
    request_body = SettlePayload,
    params(("id" = Uuid, Path, description = "ID da despesa")),
    responses(
        (status = 200, description = "Despesa paga", body = Expense),
        (status = 400, description = "Já paga, não-caixa ou sem conta pagadora")
    ),
    security(("api_jwt" = []))
)]
pub async fn pay_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFinance>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    payload: Option<Json<SettlePayload>>,
) -> Result<Json<Expense>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    validate_payload(&payload, &locale)?;

    let expense = app_state
        .finance_service
        .pay_expense(id, payload.payment_date, payload.payer_account_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(expense))
}

// =========================================================================
//  RECEITAS
// =========================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePayload {
    #[validate(required(message = "O campo 'category' é obrigatório."))]
    #[schema(example = "cattle_sales")]
    pub category: Option<String>,

    #[validate(
        required(message = "O campo 'description' é obrigatório."),
        length(min = 1, max = 255, message = "A descrição deve ter entre 1 e 255 caracteres.")
    )]
    pub description: Option<String>,

    #[validate(
        required(message = "O campo 'totalAmount' é obrigatório."),
        custom(function = "validate_not_negative")
    )]
    pub total_amount: Option<Decimal>,

    #[validate(
        required(message = "O campo 'dueDate' é obrigatório."),
        custom(function = "validate_business_date")
    )]
    pub due_date: Option<NaiveDate>,

    pub sale_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub payer_account_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl RevenuePayload {
    fn into_new(self, user_id: Uuid) -> NewRevenue {
        NewRevenue {
            category: self.category.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            total_amount: self.total_amount.unwrap_or_default(),
            due_date: self.due_date.unwrap_or_default(),
            sale_id: self.sale_id,
            buyer_id: self.buyer_id,
            payer_account_id: self.payer_account_id,
            notes: self.notes,
            user_id: Some(user_id),
        }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RevenueQuery {
    pub category: Option<String>,
    pub is_received: Option<bool>,
    #[validate(custom(function = "validate_business_date"))]
    pub start_date: Option<NaiveDate>,
    #[validate(custom(function = "validate_business_date"))]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceivePayload {
    /// Padrão: hoje
    #[validate(custom(function = "validate_business_date"))]
    pub receipt_date: Option<NaiveDate>,
    pub payer_account_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/revenues",
    tag = "Finance",
    params(RevenueQuery, PaginationParams),
    responses((status = 200, description = "Receitas", body = Paginated<Revenue>)),
    security(("api_jwt" = []))
)]
pub async fn list_revenues(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(query), _): WithRejection<Query<RevenueQuery>, AppError>,
    WithRejection(Query(paging), _): WithRejection<Query<PaginationParams>, AppError>,
) -> Result<Json<Paginated<Revenue>>, ApiError> {
    validate_payload(&query, &locale)?;

    let filter = FinanceFilter {
        category: query.category,
        settled: query.is_received,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let page = app_state
        .finance_service
        .list_revenues(&filter, &paging)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/revenues/{id}",
    tag = "Finance",
    params(("id" = Uuid, Path, description = "ID da receita")),
    responses(
        (status = 200, description = "Receita", body = Revenue),
        (status = 404, description = "Receita não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_revenue(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Revenue>, ApiError> {
    let revenue = app_state
        .finance_service
        .get_revenue(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(revenue))
}

#[utoipa::path(
    post,
    path = "/api/v1/revenues",
    tag = "Finance",
    request_body = RevenuePayload,
    responses(
        (status = 201, description = "Receita lançada", body = Revenue),
        (status = 400, description = "Dados inválidos ou categoria desconhecida")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_revenue(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Json(payload), _): WithRejection<Json<RevenuePayload>, AppError>,
) -> Result<impl IntoResponse, ApiError> {
    validate_payload(&payload, &locale)?;

    let revenue = app_state
        .finance_service
        .create_revenue(payload.into_new(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(revenue)))
}

#[utoipa::path(
    put,
    path = "/api/v1/revenues/{id}",
    tag = "Finance",
    request_body = RevenuePayload,
    params(("id" = Uuid, Path, description = "ID da receita")),
    responses(
        (status = 200, description = "Receita atualizada", body = Revenue),
        (status = 400, description = "Receita já recebida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_revenue(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermWrite>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<RevenuePayload>, AppError>,
) -> Result<Json<Revenue>, ApiError> {
    validate_payload(&payload, &locale)?;

    let revenue = app_state
        .finance_service
        .update_revenue(id, payload.into_new(user.0.id))
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(revenue))
}

#[utoipa::path(
    delete,
    path = "/api/v1/revenues/{id}",
    tag = "Finance",
    params(("id" = Uuid, Path, description = "ID da receita")),
    responses(
        (status = 204, description = "Receita removida"),
        (status = 400, description = "Receita já recebida"),
        (status = 404, description = "Receita não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_revenue(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermDelete>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, ApiError> {
    app_state
        .finance_service
        .delete_revenue(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/revenues/{id}/receive",
    tag = "Finance",
    request_body = ReceivePayload,
    params(("id" = Uuid, Path, description = "ID da receita")),
    responses(
        (status = 200, description = "Receita recebida", body = Revenue),
        (status = 400, description = "Já recebida ou sem conta")
    ),
    security(("api_jwt" = []))
)]
pub async fn receive_revenue(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermFinance>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    payload: Option<Json<ReceivePayload>>,
) -> Result<Json<Revenue>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    validate_payload(&payload, &locale)?;

    let revenue = app_state
        .finance_service
        .receive_revenue(id, payload.receipt_date, payload.payer_account_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(revenue))
}

// =========================================================================
//  RELATÓRIOS
// =========================================================================

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    /// Padrão: primeiro dia do mês corrente
    #[validate(custom(function = "validate_business_date"))]
    pub start_date: Option<NaiveDate>,
    /// Padrão: último dia do mês corrente
    #[validate(custom(function = "validate_business_date"))]
    pub end_date: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/v1/cash-flows",
    tag = "Finance",
    params(PeriodQuery),
    responses((status = 200, description = "Fluxo de caixa do período", body = CashFlowSnapshot)),
    security(("api_jwt" = []))
)]
pub async fn get_cash_flow(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(period), _): WithRejection<Query<PeriodQuery>, AppError>,
) -> Result<Json<CashFlowSnapshot>, ApiError> {
    validate_payload(&period, &locale)?;

    let snapshot = app_state
        .finance_service
        .cash_flow(period.start_date, period.end_date)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(snapshot))
}

#[utoipa::path(
    get,
    path = "/api/v1/dre",
    tag = "Finance",
    params(PeriodQuery),
    responses((status = 200, description = "Demonstração de resultado", body = DreStatement)),
    security(("api_jwt" = []))
)]
pub async fn get_dre(
    State(app_state): State<AppState>,
    locale: Locale,
    WithRejection(Query(period), _): WithRejection<Query<PeriodQuery>, AppError>,
) -> Result<Json<DreStatement>, ApiError> {
    validate_payload(&period, &locale)?;

    let statement = app_state
        .finance_service
        .dre(period.start_date, period.end_date)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(statement))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deaths_default_to_non_cash() {
        let payload: ExpensePayload = serde_json::from_str(
            r#"{"category": "deaths", "description": "Baixa", "totalAmount": 3200, "dueDate": "2025-03-10"}"#,
        )
        .unwrap();
        assert!(payload.validate().is_ok());
        assert!(!payload.into_new(Uuid::new_v4()).impacts_cash_flow);
    }

    #[test]
    fn explicit_flag_wins_over_category_default() {
        let payload: ExpensePayload = serde_json::from_str(
            r#"{"category": "feed", "description": "Ração", "totalAmount": 100, "dueDate": "2025-03-10", "impactsCashFlow": false}"#,
        )
        .unwrap();
        assert!(!payload.into_new(Uuid::new_v4()).impacts_cash_flow);
    }

    #[test]
    fn negative_amount_and_missing_due_date_are_rejected() {
        let payload: ExpensePayload =
            serde_json::from_str(r#"{"category": "feed", "description": "Ração", "totalAmount": -1}"#).unwrap();
        let errors = payload.validate().unwrap_err();
        // valor negativo + vencimento ausente
        assert_eq!(errors.field_errors().len(), 2);
    }

    #[test]
    fn period_filters_outside_the_supported_years_are_rejected() {
        let query: PeriodQuery =
            serde_json::from_str(r#"{"startDate": "0001-01-01", "endDate": "2025-03-31"}"#).unwrap();
        assert!(query.validate().is_err());

        let query: PeriodQuery = serde_json::from_str(r#"{"startDate": "2025-01-01"}"#).unwrap();
        assert!(query.validate().is_ok());
    }
}

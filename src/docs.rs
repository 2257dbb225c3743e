// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "BoviControl API", description = "Gestão de confinamento bovino"),
    paths(
        // --- Health ---
        handlers::health::health_check,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Users ---
        handlers::auth::list_users,
        handlers::auth::update_user_role,

        // --- Partners ---
        handlers::partners::list_partners,
        handlers::partners::get_partner,
        handlers::partners::create_partner,
        handlers::partners::update_partner,
        handlers::partners::delete_partner,

        // --- Cattle Purchases ---
        handlers::cattle_purchases::list_purchases,
        handlers::cattle_purchases::get_purchase,
        handlers::cattle_purchases::create_purchase,
        handlers::cattle_purchases::update_purchase,
        handlers::cattle_purchases::delete_purchase,
        handlers::cattle_purchases::register_reception,
        handlers::cattle_purchases::register_deaths,

        // --- Lots ---
        handlers::lots::list_lots,
        handlers::lots::get_lot,
        handlers::lots::create_lot,
        handlers::lots::update_lot,
        handlers::lots::delete_lot,
        handlers::lots::list_weights,
        handlers::lots::add_weight,
        handlers::lots::list_mortalities,
        handlers::lots::add_mortality,
        handlers::lots::list_movements,
        handlers::lots::transfer_lot,
        handlers::lots::get_performance,

        // --- Interventions ---
        handlers::interventions::list_interventions,
        handlers::interventions::get_intervention,
        handlers::interventions::create_intervention,
        handlers::interventions::delete_intervention,
        handlers::interventions::get_history,
        handlers::interventions::get_intervention_stats,
        handlers::interventions::get_mortality_analysis,

        // --- Pens ---
        handlers::pens::list_pens,
        handlers::pens::get_pen,
        handlers::pens::create_pen,
        handlers::pens::update_pen,
        handlers::pens::delete_pen,
        handlers::pens::get_occupancy,
        handlers::pens::allocate_lot,
        handlers::pens::release_allocation,

        // --- Finance ---
        handlers::finance::create_payer_account,
        handlers::finance::list_payer_accounts,
        handlers::finance::get_payer_account,
        handlers::finance::list_expenses,
        handlers::finance::get_expense,
        handlers::finance::create_expense,
        handlers::finance::update_expense,
        handlers::finance::delete_expense,
        handlers::finance::pay_expense,
        handlers::finance::list_revenues,
        handlers::finance::get_revenue,
        handlers::finance::create_revenue,
        handlers::finance::update_revenue,
        handlers::finance::delete_revenue,
        handlers::finance::receive_revenue,
        handlers::finance::get_cash_flow,
        handlers::finance::get_dre,

        // --- Dashboard ---
        handlers::dashboard::get_stats,

        // --- Sales ---
        handlers::sales::list_sales,
        handlers::sales::get_pipeline,
        handlers::sales::get_sale,
        handlers::sales::create_sale,
        handlers::sales::update_sale,
        handlers::sales::delete_sale,
        handlers::sales::update_sale_status,
    ),
    components(
        schemas(
            // --- Health ---
            models::health::HealthStatus,
            models::health::HealthServer,

            // --- Auth ---
            models::auth::Role,
            models::auth::UserProfile,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::UpdateRolePayload,
            models::auth::AuthResponse,

            // --- Partners ---
            models::partner::PartnerType,
            models::partner::Partner,
            handlers::partners::PartnerPayload,

            // --- Cattle Purchases ---
            models::cattle_purchase::AnimalType,
            models::cattle_purchase::PurchasePaymentType,
            models::cattle_purchase::PurchaseStatus,
            models::cattle_purchase::CattlePurchase,
            handlers::cattle_purchases::CattlePurchasePayload,
            handlers::cattle_purchases::ReceptionPayload,
            handlers::cattle_purchases::DeathsPayload,

            // --- Lots ---
            models::lot::LotStatus,
            models::lot::MovementType,
            models::lot::Lot,
            models::lot::WeightRecord,
            models::lot::MortalityRecord,
            models::lot::LotMovement,
            models::lot::LotPerformance,
            handlers::lots::LotPayload,
            handlers::lots::WeightPayload,
            handlers::lots::MortalityPayload,
            handlers::lots::TransferPayload,

            // --- Interventions ---
            models::intervention::InterventionType,
            models::intervention::HealthIntervention,
            models::intervention::HistoryKind,
            models::intervention::HistoryEntry,
            models::intervention::InterventionStats,
            models::intervention::MortalityCause,
            models::intervention::MortalityAnalysis,
            handlers::interventions::InterventionPayload,

            // --- Pens ---
            models::pen::PenStatus,
            models::pen::AllocationStatus,
            models::pen::Pen,
            models::pen::PenAllocation,
            models::pen::PenOccupancy,
            handlers::pens::PenPayload,
            handlers::pens::AllocationPayload,

            // --- Finance ---
            models::finance::PayerAccount,
            models::finance::Expense,
            models::finance::Revenue,
            models::finance::CashFlowTrend,
            models::finance::CashFlowPeriod,
            models::finance::CashFlowSnapshot,
            models::finance::CategoryAmount,
            models::finance::DreStatement,
            handlers::finance::CreatePayerAccountPayload,
            handlers::finance::ExpensePayload,
            handlers::finance::RevenuePayload,
            handlers::finance::SettlePayload,
            handlers::finance::ReceivePayload,

            // --- Dashboard ---
            models::dashboard::DashboardStats,

            // --- Sales ---
            models::sale::SalePaymentType,
            models::sale::SaleStatus,
            models::sale::SaleRecord,
            models::sale::PipelineStage,
            handlers::sales::SalePayload,
            handlers::sales::SaleStatusPayload,
        )
    ),
    tags(
        (name = "Health", description = "Estado do serviço"),
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Gestão de usuários e papéis"),
        (name = "Partners", description = "Fornecedores e compradores"),
        (name = "Cattle Purchases", description = "Compras de gado e recepção"),
        (name = "Lots", description = "Lotes, pesagens, mortalidade e desempenho"),
        (name = "Interventions", description = "Vacinas, medicamentos, tratamentos e análise de mortalidade"),
        (name = "Pens", description = "Currais e alocações"),
        (name = "Finance", description = "Despesas, receitas, fluxo de caixa e DRE"),
        (name = "Dashboard", description = "Indicadores Gerenciais"),
        (name = "Sales", description = "Pipeline de vendas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_the_versioned_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/cattle-purchases"));
        assert!(doc.paths.paths.contains_key("/api/v1/pens/{id}/allocations"));
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/v1/interventions/history"));
        assert!(doc.paths.paths.contains_key("/api/v1/mortality-analysis"));
    }
}

// src/routes.rs

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

/// Monta o router completo: rotas públicas, `/api/v1` protegido, Swagger e camadas HTTP.
pub fn create_router(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        // Usuários (ADMIN)
        .route("/users", get(handlers::auth::list_users))
        .route("/users/{id}/role", patch(handlers::auth::update_user_role))
        // Parceiros
        .route(
            "/partners",
            get(handlers::partners::list_partners).post(handlers::partners::create_partner),
        )
        .route(
            "/partners/{id}",
            get(handlers::partners::get_partner)
                .put(handlers::partners::update_partner)
                .delete(handlers::partners::delete_partner),
        )
        // Contas pagadoras
        .route(
            "/payer-accounts",
            get(handlers::finance::list_payer_accounts).post(handlers::finance::create_payer_account),
        )
        .route("/payer-accounts/{id}", get(handlers::finance::get_payer_account))
        // Compras de gado
        .route(
            "/cattle-purchases",
            get(handlers::cattle_purchases::list_purchases).post(handlers::cattle_purchases::create_purchase),
        )
        .route(
            "/cattle-purchases/{id}",
            get(handlers::cattle_purchases::get_purchase)
                .put(handlers::cattle_purchases::update_purchase)
                .delete(handlers::cattle_purchases::delete_purchase),
        )
        .route("/cattle-purchases/{id}/reception", post(handlers::cattle_purchases::register_reception))
        .route("/cattle-purchases/{id}/deaths", post(handlers::cattle_purchases::register_deaths))
        // Lotes
        .route("/lots", get(handlers::lots::list_lots).post(handlers::lots::create_lot))
        .route(
            "/lots/{id}",
            get(handlers::lots::get_lot)
                .put(handlers::lots::update_lot)
                .delete(handlers::lots::delete_lot),
        )
        .route("/lots/{id}/weights", get(handlers::lots::list_weights).post(handlers::lots::add_weight))
        .route(
            "/lots/{id}/mortalities",
            get(handlers::lots::list_mortalities).post(handlers::lots::add_mortality),
        )
        .route("/lots/{id}/movements", get(handlers::lots::list_movements))
        .route("/lots/{id}/transfer", post(handlers::lots::transfer_lot))
        .route("/lots/{id}/performance", get(handlers::lots::get_performance))
        // Sanidade
        .route(
            "/interventions",
            get(handlers::interventions::list_interventions).post(handlers::interventions::create_intervention),
        )
        .route("/interventions/history", get(handlers::interventions::get_history))
        .route("/interventions/stats", get(handlers::interventions::get_intervention_stats))
        .route(
            "/interventions/{id}",
            get(handlers::interventions::get_intervention).delete(handlers::interventions::delete_intervention),
        )
        .route("/mortality-analysis", get(handlers::interventions::get_mortality_analysis))
        // Currais
        .route("/pens", get(handlers::pens::list_pens).post(handlers::pens::create_pen))
        .route(
            "/pens/{id}",
            get(handlers::pens::get_pen)
                .put(handlers::pens::update_pen)
                .delete(handlers::pens::delete_pen),
        )
        .route("/pens/{id}/occupancy", get(handlers::pens::get_occupancy))
        .route("/pens/{id}/allocations", post(handlers::pens::allocate_lot))
        .route(
            "/pens/{id}/allocations/{allocation_id}",
            delete(handlers::pens::release_allocation),
        )
        // Financeiro
        .route(
            "/expenses",
            get(handlers::finance::list_expenses).post(handlers::finance::create_expense),
        )
        .route(
            "/expenses/{id}",
            get(handlers::finance::get_expense)
                .put(handlers::finance::update_expense)
                .delete(handlers::finance::delete_expense),
        )
        .route("/expenses/{id}/pay", post(handlers::finance::pay_expense))
        .route(
            "/revenues",
            get(handlers::finance::list_revenues).post(handlers::finance::create_revenue),
        )
        .route(
            "/revenues/{id}",
            get(handlers::finance::get_revenue)
                .put(handlers::finance::update_revenue)
                .delete(handlers::finance::delete_revenue),
        )
        .route("/revenues/{id}/receive", post(handlers::finance::receive_revenue))
        .route("/cash-flows", get(handlers::finance::get_cash_flow))
        .route("/dre", get(handlers::finance::get_dre))
        // Painel
        .route("/stats", get(handlers::dashboard::get_stats))
        // Vendas
        .route("/sales", get(handlers::sales::list_sales).post(handlers::sales::create_sale))
        .route("/sales/pipeline", get(handlers::sales::get_pipeline))
        .route(
            "/sales/{id}",
            get(handlers::sales::get_sale)
                .put(handlers::sales::update_sale)
                .delete(handlers::sales::delete_sale),
        )
        .route("/sales/{id}/status", patch(handlers::sales::update_sale_status))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(&app_state.config.cors_allowed_origins);

    // Combina tudo no router principal
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1", protected_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

// Sem origens configuradas, libera qualquer uma
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Origem CORS inválida ignorada");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT_LANGUAGE])
}

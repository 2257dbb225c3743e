// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::{Duration, Instant}};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CattlePurchaseRepository, DashboardRepository, FinanceRepository, InterventionRepository,
        LotRepository, PartnerRepository, PenRepository, SaleRepository, UserRepository,
    },
    services::{
        auth::AuthService, cattle_purchase_service::CattlePurchaseService,
        dashboard_service::DashboardService, finance_service::FinanceService,
        intervention_service::InterventionService, lot_service::LotService, partner_service::PartnerService, pen_service::PenService,
        sale_service::SaleService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_addr: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout: Duration,
    pub environment: String,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration_hours: parse_var("JWT_EXPIRATION_HOURS", 168)?,
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
            database_acquire_timeout: Duration::from_secs(parse_var(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                3,
            )?),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            cors_allowed_origins,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} possui um valor inválido: {raw}")),
        Err(_) => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub started_at: Instant,
    pub auth_service: AuthService,
    pub partner_service: PartnerService,
    pub cattle_purchase_service: CattlePurchaseService,
    pub lot_service: LotService,
    pub pen_service: PenService,
    pub finance_service: FinanceService,
    pub dashboard_service: DashboardService,
    pub sale_service: SaleService,
    pub intervention_service: InterventionService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(config.database_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, config: AppConfig) -> Self {
        let user_repo = UserRepository::new();
        let partner_repo = PartnerRepository::new();
        let purchase_repo = CattlePurchaseRepository::new();
        let lot_repo = LotRepository::new();
        let pen_repo = PenRepository::new();
        let finance_repo = FinanceRepository::new();
        let dashboard_repo = DashboardRepository::new();
        let sale_repo = SaleRepository::new();
        let intervention_repo = InterventionRepository::new();

        let auth_service = AuthService::new(
            user_repo,
            config.jwt_secret.clone(),
            config.jwt_expiration_hours,
            db_pool.clone(),
        );
        let partner_service = PartnerService::new(partner_repo, db_pool.clone());
        let finance_service = FinanceService::new(finance_repo.clone(), db_pool.clone());
        let cattle_purchase_service = CattlePurchaseService::new(
            purchase_repo.clone(),
            finance_repo.clone(),
            db_pool.clone(),
        );
        let pen_service = PenService::new(pen_repo.clone(), lot_repo.clone(), db_pool.clone());
        let lot_service = LotService::new(
            lot_repo.clone(),
            pen_repo.clone(),
            purchase_repo,
            finance_repo.clone(),
            db_pool.clone(),
        );
        let dashboard_service = DashboardService::new(dashboard_repo, finance_repo.clone(), db_pool.clone());
        let intervention_service = InterventionService::new(
            intervention_repo,
            lot_repo.clone(),
            pen_repo.clone(),
            finance_repo.clone(),
            db_pool.clone(),
        );
        let sale_service = SaleService::new(sale_repo, lot_repo, pen_repo, finance_repo, db_pool.clone());

        Self {
            db_pool,
            config: Arc::new(config),
            started_at: Instant::now(),
            auth_service,
            partner_service,
            cattle_purchase_service,
            lot_service,
            pen_service,
            finance_service,
            dashboard_service,
            sale_service,
            intervention_service,
        }
    }
}

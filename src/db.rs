pub mod user_repo;
pub use user_repo::UserRepository;
pub mod partner_repo;
pub use partner_repo::PartnerRepository;
pub mod cattle_purchase_repo;
pub use cattle_purchase_repo::CattlePurchaseRepository;
pub mod lot_repo;
pub use lot_repo::LotRepository;
pub mod pen_repo;
pub use pen_repo::PenRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod sale_repo;
pub use sale_repo::SaleRepository;
pub mod intervention_repo;
pub use intervention_repo::InterventionRepository;

pub mod auth;
pub mod cattle_purchase_service;
pub mod dashboard_service;
pub mod finance_service;
pub mod intervention_service;
pub mod lot_service;
pub mod partner_service;
pub mod pen_service;
pub mod sale_service;

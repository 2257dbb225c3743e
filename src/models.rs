pub mod auth;
pub mod cattle_purchase;
pub mod dashboard;
pub mod finance;
pub mod health;
pub mod intervention;
pub mod lot;
pub mod partner;
pub mod pen;
pub mod sale;

pub mod auth;
pub mod cattle_purchases;
pub mod dashboard;
pub mod finance;
pub mod health;
pub mod interventions;
pub mod lots;
pub mod partners;
pub mod pens;
pub mod sales;

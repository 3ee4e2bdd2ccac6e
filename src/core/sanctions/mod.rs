// Sanctions module - warnings, suspensions, bans and their appeals.

pub mod sanction_models;
pub mod sanction_service;

pub use sanction_models::*;
pub use sanction_service::*;

pub mod audit_models;
pub mod audit_service;

pub use audit_models::*;
pub use audit_service::*;

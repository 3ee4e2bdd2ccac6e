// Content action module - hide/show/delete/restore with audit trail.

pub mod action_models;
pub mod action_service;

pub use action_models::*;
pub use action_service::*;

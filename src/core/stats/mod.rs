pub mod stats_models;
pub mod stats_service;

pub use stats_models::*;
pub use stats_service::*;

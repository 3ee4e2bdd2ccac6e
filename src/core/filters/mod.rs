// Filter module - rule-based automated content screening.
// Following the same pattern as the reports module.

pub mod filter_models;
pub mod filter_service;

pub use filter_models::*;
pub use filter_service::*;

// Report intake module - dedupe, category-to-priority mapping, review.

pub mod report_models;
pub mod report_service;

pub use report_models::*;
pub use report_service::*;

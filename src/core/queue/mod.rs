// Moderation queue module - priority buckets and single-owner claims.

pub mod queue_models;
pub mod queue_service;

pub use queue_models::*;
pub use queue_service::*;

// The api module is the transport-agnostic surface: request/response
// shapes plus the facade an embedding server routes to.

#[path = "requests.rs"]
pub mod requests;

#[path = "moderation_api.rs"]
pub mod moderation_api;

pub use moderation_api::{ModerationApi, ModerationStore};

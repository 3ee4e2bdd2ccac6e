// Moderation subsystem for a discussion platform: report intake, a
// prioritized review queue, content actions with an append-only audit log,
// user sanctions with appeals, and automated filter rules.
//
// **Architecture Overview:**
// - `core/` = Business logic (storage-agnostic)
// - `infra/` = Implementations of core traits (memory, sqlite, gateways)
// - `api/` = Transport-agnostic surface (DTOs, facade)
//
// The embedding platform constructs a `ModerationApi` over one store, a
// content gateway and a notifier, and routes its moderation endpoints to
// the facade's methods.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;
#[path = "api/api_layer.rs"]
pub mod api;

pub use crate::api::{ModerationApi, ModerationStore};
pub use crate::core::config::ModerationConfig;
pub use crate::core::error::{ModResult, ModerationError};
pub use crate::core::identity::{Caller, Role};

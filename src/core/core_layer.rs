// The core module contains all business logic.
// Each feature gets its own submodule; shared types live at the top level.

#[path = "error.rs"]
pub mod error;

#[path = "ids.rs"]
pub mod ids;

#[path = "identity.rs"]
pub mod identity;

#[path = "config.rs"]
pub mod config;

#[path = "content.rs"]
pub mod content;

#[path = "notify.rs"]
pub mod notify;

#[path = "audit/mod.rs"]
pub mod audit;

#[path = "reports/mod.rs"]
pub mod reports;

#[path = "queue/mod.rs"]
pub mod queue;

#[path = "actions/mod.rs"]
pub mod actions;

#[path = "sanctions/mod.rs"]
pub mod sanctions;

#[path = "filters/mod.rs"]
pub mod filters;

#[path = "stats/mod.rs"]
pub mod stats;

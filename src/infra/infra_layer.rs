// The infra module contains implementations of core traits.
// Each adapter goes in its own submodule.

#[path = "memory/memory_store.rs"]
pub mod memory;

#[path = "sqlite/sqlite_store.rs"]
pub mod sqlite;

#[path = "gateway/content_gateway.rs"]
pub mod gateway;

#[path = "notify/notifiers.rs"]
pub mod notify;

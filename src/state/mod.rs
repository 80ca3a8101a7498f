//! Shared runtime state of a live page.
//!
//! - `store`: the component state store (component states, form values, page and user snapshots).
//! - `refresh`: the refresh listener registry.

pub mod refresh;
pub mod store;

pub use refresh::{RefreshCallback, RefreshRegistry, RefreshSubscription};
pub use store::{ComponentRuntimeState, ComponentStateStore, PageInfo, PageRuntimeState, UserInfo};

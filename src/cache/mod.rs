//! In-memory query cache shared by every screen.
//!
//! This module provides a backend-agnostic caching mechanism that:
//! - Stores one value per composite query key
//! - Coalesces concurrent fetches of the same key
//! - Marks whole query families stale on invalidation
//! - Broadcasts updates so open views can refetch

mod client;
mod store;
mod traits;

pub use client::QueryClient;
pub use traits::{CacheEvent, CacheResult, EntryStatus};

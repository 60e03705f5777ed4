pub mod actor;
pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod connection;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod transport;
pub mod types;

pub use cached_client::CachedBackend;
pub use error::BackendError;

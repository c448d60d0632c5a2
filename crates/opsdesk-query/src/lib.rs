//! Polling subscriptions over the opsdesk admin API.
//!
//! A [`Subscription`] binds a [`DomainFetcher`] to a dependency fingerprint
//! and an optional poll interval, and publishes a [`QueryState`] that only
//! ever reflects the newest request's outcome.

pub mod error;
pub mod executor;
pub mod fetcher;
pub mod http_client;
pub mod resources;
pub mod state;
pub mod subscription;

pub use error::FetchError;
pub use executor::{extract_error_message, Endpoint, FetchExecutor, HttpExecutor};
pub use fetcher::{fetcher_fn, DomainFetcher, FnFetcher, QueryParams, ResourceFetcher};
pub use http_client::ClientSettings;
pub use resources::Resource;
pub use state::QueryState;
pub use subscription::{QueryOptions, Subscription};

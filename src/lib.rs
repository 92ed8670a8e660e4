//! Read-only analytics core for a crop certification dashboard.
//!
//! Six fixed reports are loaded from Postgres through a TTL query
//! cache, bound to declared schemas with calendar derivation, then
//! filtered, reshaped and aggregated in memory into chart-ready
//! tables. All recomputation is pure: loading mutates the dashboard,
//! everything downstream of a [`Selection`] returns new frames.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod derive;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod reshape;
pub mod schema;
pub mod source;
pub mod views;

pub use cache::QueryCache;
pub use config::DashConfig;
pub use dashboard::{Dashboard, DashboardViews};
pub use derive::{derive, Dataset};
pub use error::DashError;
pub use filter::Selection;
pub use loader::{LoadFailure, Loader};
pub use source::{Cell, PostgresSource, QuerySource};

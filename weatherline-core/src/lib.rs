//! Core library for the `weatherline` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The One Call transport, endpoints and payload normalizer
//! - Timeline stitching, (day, hour) resolution and icon classification
//! - The engine that keeps the last good data, plus its refresh loop
//!
//! It is used by `weatherline-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod icon;
pub mod local;
pub mod model;
pub mod normalize;
pub mod projection;
pub mod refresh;
pub mod resolve;
pub mod timeline;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{Config, Location, RefreshSettings};
pub use endpoint::{Endpoint, Endpoints, PayloadKind};
pub use engine::{Session, WeatherEngine};
pub use error::{FetchError, WeatherError};
pub use fetch::{Fetcher, fetcher_from_config};
pub use icon::{IconSelection, classify};
pub use local::TimezoneOffset;
pub use model::{Alert, PointKind, WeatherPoint, WeatherSnapshot};
pub use normalize::normalize;
pub use projection::{AlertNotice, Projection, project};
pub use refresh::{RefreshConfig, RefreshEvent, RefreshKind};
pub use resolve::Resolver;
pub use timeline::{Timeline, stitch};
pub use transport::{HttpTransport, Transport, TransportError};

//! Redfish sensor fetching.
//!
//! A [`fetcher::RedfishFetcher`] issues one GET per call against a chassis
//! resource and reshapes the records described by a [`sensor::SensorProfile`]
//! into a [`StatMap`].

pub mod error;
pub mod fetcher;
pub mod sensor;

use rfmon_common::stats::StatMap;

/// A source of per-cycle sensor stats.
///
/// The poller calls [`fetch`](Self::fetch) once per tick. Implementations
/// must not return partial results: any failure fails the whole fetch.
#[async_trait::async_trait]
pub trait SensorSource: Send + Sync {
    /// Source name (e.g., `"redfish-fan"`), used for logging.
    fn name(&self) -> &str;

    /// Fetches the current readings.
    async fn fetch(&self) -> error::Result<StatMap>;
}

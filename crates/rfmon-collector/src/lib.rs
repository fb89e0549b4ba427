//! Stat dispatching and the per-cycle poll loop.
//!
//! A [`poll::Poller`] fetches a [`StatMap`](rfmon_common::stats::StatMap)
//! from its [`SensorSource`](rfmon_redfish::SensorSource), hands it to the
//! [`dispatch::Dispatcher`], which emits one
//! [`MetricEvent`](rfmon_common::types::MetricEvent) per numeric leaf into a
//! [`sink::MetricSink`].

pub mod dispatch;
pub mod error;
pub mod poll;
pub mod sink;

#[cfg(test)]
mod test_support;

//! Shared data model for the rfmon workspace: the nested stat map produced by
//! sensor fetchers, the metric events handed to sinks, and per-plugin settings.

pub mod settings;
pub mod stats;
pub mod types;

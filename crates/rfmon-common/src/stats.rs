//! The nested stat map: `category -> host -> instance -> key -> value`.
//!
//! A value is either a bare number ([`StatValue::Leaf`]) or one more level of
//! named numbers ([`StatValue::Bucket`]). The variant is chosen by whoever
//! builds the map, so consumers never have to guess the depth.

use crate::types::SensorReading;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value stored under the fourth level of a [`StatMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Leaf(f64),
    Bucket(HashMap<String, f64>),
}

impl StatValue {
    /// Number of numeric leaves carried by this value.
    pub fn leaf_count(&self) -> usize {
        match self {
            StatValue::Leaf(_) => 1,
            StatValue::Bucket(values) => values.len(),
        }
    }
}

pub type InstanceStats = HashMap<String, StatValue>;
pub type HostStats = HashMap<String, InstanceStats>;
pub type CategoryStats = HashMap<String, HostStats>;

/// Borrowed view of one `key -> value` entry together with its location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatEntry<'a> {
    pub category: &'a str,
    pub host: &'a str,
    pub instance: &'a str,
    pub key: &'a str,
    pub value: &'a StatValue,
}

/// Per-cycle stats keyed `category -> host -> instance -> key`.
///
/// # Examples
///
/// ```
/// use rfmon_common::stats::StatMap;
///
/// let mut stats = StatMap::new();
/// stats.insert_bucket_value("redfish", "host1", "fan", "Fan1", "fanspeed", 5000.0);
/// stats.insert_leaf("redfish", "host1", "fan", "count", 1.0);
/// assert_eq!(stats.leaf_count(), 2);
/// assert!(!stats.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatMap(HashMap<String, CategoryStats>);

impl StatMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn instance_mut(&mut self, category: &str, host: &str, instance: &str) -> &mut InstanceStats {
        self.0
            .entry(category.to_string())
            .or_default()
            .entry(host.to_string())
            .or_default()
            .entry(instance.to_string())
            .or_default()
    }

    /// Stores a bare number under `key`, replacing whatever was there.
    pub fn insert_leaf(&mut self, category: &str, host: &str, instance: &str, key: &str, value: f64) {
        self.instance_mut(category, host, instance)
            .insert(key.to_string(), StatValue::Leaf(value));
    }

    /// Stores `value` under `key -> sub`. A leaf already stored under `key` is
    /// replaced by a fresh bucket.
    pub fn insert_bucket_value(
        &mut self,
        category: &str,
        host: &str,
        instance: &str,
        key: &str,
        sub: &str,
        value: f64,
    ) {
        let slot = self
            .instance_mut(category, host, instance)
            .entry(key.to_string())
            .or_insert_with(|| StatValue::Bucket(HashMap::new()));
        match slot {
            StatValue::Bucket(values) => {
                values.insert(sub.to_string(), value);
            }
            StatValue::Leaf(_) => {
                *slot = StatValue::Bucket(HashMap::from([(sub.to_string(), value)]));
            }
        }
    }

    /// Files a reading as `category -> hostname -> instance -> name -> {type: value}`.
    pub fn push(&mut self, reading: &SensorReading) {
        self.insert_bucket_value(
            &reading.category,
            &reading.hostname,
            &reading.instance,
            &reading.name,
            &reading.metric_type,
            reading.value,
        );
    }

    /// `true` when no category holds a single value.
    pub fn is_empty(&self) -> bool {
        self.leaf_count() == 0
    }

    pub fn leaf_count(&self) -> usize {
        self.entries().map(|e| e.value.leaf_count()).sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn get(&self, category: &str, host: &str, instance: &str, key: &str) -> Option<&StatValue> {
        self.0.get(category)?.get(host)?.get(instance)?.get(key)
    }

    /// Iterates every `key -> value` entry. Order is unspecified.
    pub fn entries(&self) -> impl Iterator<Item = StatEntry<'_>> {
        self.0.iter().flat_map(|(category, hosts)| {
            hosts.iter().flat_map(move |(host, instances)| {
                instances.iter().flat_map(move |(instance, keys)| {
                    keys.iter().map(move |(key, value)| StatEntry {
                        category,
                        host,
                        instance,
                        key,
                        value,
                    })
                })
            })
        })
    }
}

impl FromIterator<SensorReading> for StatMap {
    fn from_iter<I: IntoIterator<Item = SensorReading>>(iter: I) -> Self {
        let mut stats = StatMap::new();
        for reading in iter {
            stats.push(&reading);
        }
        stats
    }
}

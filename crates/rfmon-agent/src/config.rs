use anyhow::{bail, Context};
use rfmon_collector::sink::SinkKind;
use rfmon_common::settings::{PluginSettings, DEFAULT_INTERVAL_SECS, DEFAULT_PREFIX};
use rfmon_redfish::fetcher::{endpoint_url, Credentials};
use rfmon_redfish::sensor::SensorProfile;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_CHASSIS: &str = "1";

/// Keys accepted both at the top level and inside a `[[Plugin]]` block.
/// Plugin values override top-level ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginOptions {
    pub prefix: Option<String>,
    /// Full URL of the resource to poll.
    pub endpoint: Option<String>,
    /// BMC address; the endpoint is built from it when `Endpoint` is unset.
    pub address: Option<String>,
    pub chassis: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Redfish session token, used instead of basic auth when set.
    pub token: Option<String>,
    pub hostname: Option<String>,
    pub verbose: Option<bool>,
    pub debug: Option<bool>,
    /// Poll period in seconds.
    pub interval: Option<f64>,
}

impl PluginOptions {
    fn or(self, fallback: &PluginOptions) -> PluginOptions {
        let fb = fallback.clone();
        PluginOptions {
            prefix: self.prefix.or(fb.prefix),
            endpoint: self.endpoint.or(fb.endpoint),
            address: self.address.or(fb.address),
            chassis: self.chassis.or(fb.chassis),
            user: self.user.or(fb.user),
            password: self.password.or(fb.password),
            token: self.token.or(fb.token),
            hostname: self.hostname.or(fb.hostname),
            verbose: self.verbose.or(fb.verbose),
            debug: self.debug.or(fb.debug),
            interval: self.interval.or(fb.interval),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginBlock {
    /// `fan`, `power`, `thermal`, or the name of a `[[Sensor]]` block.
    pub sensor: String,
    #[serde(flatten)]
    pub options: PluginOptions,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

/// Operator-defined sensor category.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorBlock {
    pub name: String,
    pub field: String,
    pub name_field: String,
    pub value_field: String,
    #[serde(rename = "Type")]
    pub metric_type: String,
    pub resource: Option<String>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentConfig {
    #[serde(flatten)]
    pub defaults: PluginOptions,
    /// `putval` (default) or `log`.
    pub output: Option<String>,
    #[serde(default, rename = "Plugin")]
    pub plugins: Vec<PluginBlock>,
    #[serde(default, rename = "Sensor")]
    pub sensors: Vec<SensorBlock>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

/// A configuration key nobody recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey {
    pub section: String,
    pub key: String,
}

/// Everything needed to start one plugin task.
#[derive(Debug, Clone)]
pub struct PluginPlan {
    pub settings: PluginSettings,
    pub endpoint: String,
    pub credentials: Credentials,
    pub profile: SensorProfile,
}

#[derive(Debug, Clone)]
pub struct AgentPlan {
    pub output: SinkKind,
    pub plugins: Vec<PluginPlan>,
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {path}"))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Keys that were ignored, in file order per section.
    pub fn unknown_keys(&self) -> Vec<UnknownKey> {
        let mut keys: Vec<UnknownKey> = self
            .unknown
            .keys()
            .map(|key| UnknownKey {
                section: "top level".to_string(),
                key: key.clone(),
            })
            .collect();
        for (i, plugin) in self.plugins.iter().enumerate() {
            keys.extend(plugin.unknown.keys().map(|key| UnknownKey {
                section: format!("Plugin[{i}] ({})", plugin.sensor),
                key: key.clone(),
            }));
        }
        for sensor in &self.sensors {
            keys.extend(sensor.unknown.keys().map(|key| UnknownKey {
                section: format!("Sensor {}", sensor.name),
                key: key.clone(),
            }));
        }
        keys
    }

    /// Resolves every plugin against the top-level defaults.
    ///
    /// Without `[[Plugin]]` blocks, the built-in fan, power and thermal
    /// sensors are polled with the top-level settings.
    pub fn resolve(&self, default_hostname: &str) -> anyhow::Result<AgentPlan> {
        let output = match &self.output {
            Some(kind) => kind.parse::<SinkKind>().map_err(anyhow::Error::msg)?,
            None => SinkKind::default(),
        };

        let plugins = if self.plugins.is_empty() {
            SensorProfile::BUILTIN
                .into_iter()
                .map(|profile| self.plan(profile, PluginOptions::default(), default_hostname))
                .collect::<anyhow::Result<Vec<_>>>()?
        } else {
            self.plugins
                .iter()
                .map(|block| {
                    let profile = self.profile(&block.sensor)?;
                    self.plan(profile, block.options.clone(), default_hostname)
                })
                .collect::<anyhow::Result<Vec<_>>>()?
        };

        Ok(AgentPlan { output, plugins })
    }

    fn profile(&self, name: &str) -> anyhow::Result<SensorProfile> {
        if let Some(block) = self.sensors.iter().find(|s| s.name.eq_ignore_ascii_case(name)) {
            let resource = block.resource.clone().unwrap_or_default();
            return Ok(SensorProfile::custom(
                &block.name,
                &block.field,
                &block.name_field,
                &block.value_field,
                &block.metric_type,
                resource,
            ));
        }
        SensorProfile::builtin(name).with_context(|| format!("unknown sensor '{name}'"))
    }

    fn plan(
        &self,
        profile: SensorProfile,
        options: PluginOptions,
        default_hostname: &str,
    ) -> anyhow::Result<PluginPlan> {
        let opts = options.or(&self.defaults);

        let interval_secs = opts.interval.unwrap_or(DEFAULT_INTERVAL_SECS);
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            bail!("sensor '{}': Interval must be a positive number of seconds, got {interval_secs}", profile.name);
        }

        let endpoint = match (&opts.endpoint, &opts.address) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(address)) => {
                if profile.resource.is_empty() {
                    bail!("sensor '{}': Address requires the sensor to define a Resource", profile.name);
                }
                let chassis = opts.chassis.as_deref().unwrap_or(DEFAULT_CHASSIS);
                endpoint_url(address, chassis, &profile.resource)
            }
            (None, None) => bail!("sensor '{}': either Endpoint or Address must be set", profile.name),
        };

        let credentials = match (opts.token, opts.user) {
            (Some(token), _) => Credentials::Token(token),
            (None, Some(user)) => Credentials::Basic {
                user,
                password: opts.password.unwrap_or_default(),
            },
            (None, None) => Credentials::None,
        };

        let settings = PluginSettings {
            prefix: opts.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            hostname: opts.hostname.unwrap_or_else(|| default_hostname.to_string()),
            interval: Duration::from_secs_f64(interval_secs),
            verbose: opts.verbose.unwrap_or(false),
            debug: opts.debug.unwrap_or(false),
        };

        Ok(PluginPlan {
            settings,
            endpoint,
            credentials,
            profile,
        })
    }
}

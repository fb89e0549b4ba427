use crate::error::{RedfishError, Result};
use crate::sensor::SensorProfile;
use crate::SensorSource;
use reqwest::Client;
use rfmon_common::settings::PluginSettings;
use rfmon_common::stats::StatMap;
use rfmon_common::types::SensorReading;
use serde_json::Value;
use std::collections::HashSet;

/// Maximum number of characters kept from an error response body.
const MAX_ERROR_BODY_CHARS: usize = 200;

const REDFISH_CHASSIS_ROOT: &str = "redfish/v1/Chassis";

/// How requests authenticate against the Redfish service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic auth.
    Basic { user: String, password: String },
    /// Pre-issued Redfish session token, sent as `X-Auth-Token`.
    Token(String),
    None,
}

/// Builds a chassis resource URL from a BMC address.
///
/// # Examples
///
/// ```
/// use rfmon_redfish::fetcher::endpoint_url;
///
/// assert_eq!(
///     endpoint_url("10.0.0.5", "1", "Thermal"),
///     "https://10.0.0.5/redfish/v1/Chassis/1/Thermal"
/// );
/// assert_eq!(
///     endpoint_url("http://bmc.local:8000/", "Self", "Power"),
///     "http://bmc.local:8000/redfish/v1/Chassis/Self/Power"
/// );
/// ```
pub fn endpoint_url(address: &str, chassis: &str, resource: &str) -> String {
    let addr = address.trim().trim_end_matches('/');
    let base = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("https://{addr}")
    };
    format!("{base}/{REDFISH_CHASSIS_ROOT}/{chassis}/{resource}")
}

/// Fetches one sensor category from a Redfish endpoint.
pub struct RedfishFetcher {
    name: String,
    endpoint: String,
    credentials: Credentials,
    profile: SensorProfile,
    settings: PluginSettings,
    client: Client,
}

impl RedfishFetcher {
    /// Creates a fetcher. TLS certificates are not verified.
    ///
    /// # Errors
    ///
    /// Returns [`RedfishError::Config`] for an empty endpoint, or
    /// [`RedfishError::Network`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        credentials: Credentials,
        profile: SensorProfile,
        settings: PluginSettings,
    ) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(RedfishError::Config(format!(
                "empty endpoint for sensor '{}'",
                profile.name
            )));
        }

        let client = Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            name: format!("{}-{}", settings.prefix, profile.name),
            endpoint: endpoint.trim().to_string(),
            credentials,
            profile,
            settings,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn profile(&self) -> &SensorProfile {
        &self.profile
    }

    async fn get_json(&self) -> Result<Value> {
        let request = self.client.get(&self.endpoint);
        let request = match &self.credentials {
            Credentials::Basic { user, password } => request.basic_auth(user, Some(password)),
            Credentials::Token(token) => request.header("X-Auth-Token", token),
            Credentials::None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RedfishError::Http {
                status: status.as_u16(),
                body: truncate_body(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl SensorSource for RedfishFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<StatMap> {
        let body = self.get_json().await?;
        let readings = readings_from_body(&body, &self.profile, &self.settings)?;
        tracing::debug!(
            source = %self.name,
            count = readings.len(),
            "Parsed sensor readings"
        );
        Ok(readings.into_iter().collect())
    }
}

/// Reshapes a Redfish payload into one reading per record of the profile's
/// array field. Any malformed record fails the whole payload.
///
/// # Errors
///
/// Returns [`RedfishError::MissingField`] or [`RedfishError::InvalidField`]
/// when the payload does not match `profile`.
pub fn readings_from_body(
    body: &Value,
    profile: &SensorProfile,
    settings: &PluginSettings,
) -> Result<Vec<SensorReading>> {
    let field: &str = &profile.field;
    let records = body
        .get(field)
        .ok_or_else(|| RedfishError::MissingField {
            field: field.to_string(),
            context: "response body".to_string(),
        })?
        .as_array()
        .ok_or_else(|| RedfishError::InvalidField {
            field: field.to_string(),
            context: "response body".to_string(),
            expected: "an array",
        })?;

    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let context = format!("{field}[{i}]");
            let name = required(record, &profile.name_field, &context)?
                .as_str()
                .ok_or_else(|| invalid(&profile.name_field, &context, "a string"))?;
            let value = required(record, &profile.value_field, &context)?
                .as_f64()
                .ok_or_else(|| invalid(&profile.value_field, &context, "a number"))?;

            Ok(SensorReading {
                category: settings.prefix.clone(),
                hostname: settings.hostname.clone(),
                instance: profile.name.to_string(),
                name: unique_name(name, record, i, &context, &mut seen),
                metric_type: profile.metric_type.to_string(),
                value,
            })
        })
        .collect()
}

/// Keeps reading names distinct within one payload so no record overwrites
/// another. A repeated name gets the record's `MemberId`, or failing that its
/// array index, appended in brackets.
fn unique_name(name: &str, record: &Value, index: usize, context: &str, seen: &mut HashSet<String>) -> String {
    if seen.insert(name.to_string()) {
        return name.to_string();
    }

    let by_member = record
        .get("MemberId")
        .and_then(Value::as_str)
        .map(|id| format!("{name} [{id}]"))
        .filter(|candidate| !seen.contains(candidate));
    let renamed = by_member.unwrap_or_else(|| format!("{name} [{index}]"));

    tracing::warn!(name, renamed = %renamed, context, "Duplicate sensor name");
    seen.insert(renamed.clone());
    renamed
}

fn required<'a>(record: &'a Value, field: &str, context: &str) -> Result<&'a Value> {
    record.get(field).ok_or_else(|| RedfishError::MissingField {
        field: field.to_string(),
        context: context.to_string(),
    })
}

fn invalid(field: &str, context: &str, expected: &'static str) -> RedfishError {
    RedfishError::InvalidField {
        field: field.to_string(),
        context: context.to_string(),
        expected,
    }
}

/// Truncates to at most `max` bytes on a char boundary.
fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfmon_common::stats::StatValue;
    use serde_json::json;
    use std::collections::HashMap;

    fn settings() -> PluginSettings {
        PluginSettings::new("host1")
    }

    #[test]
    fn reshapes_fan_records() {
        let body = json!({"Fans": [
            {"FanName": "Fan1", "ReadingRPM": 5000},
            {"FanName": "Fan2", "ReadingRPM": 5100.5, "Status": {"State": "Enabled"}}
        ]});

        let readings = readings_from_body(&body, &SensorProfile::FAN, &settings()).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].category, "redfish");
        assert_eq!(readings[0].hostname, "host1");
        assert_eq!(readings[0].instance, "fan");
        assert_eq!(readings[0].name, "Fan1");
        assert_eq!(readings[0].metric_type, "fanspeed");
        assert_eq!(readings[1].value, 5100.5);
    }

    #[test]
    fn empty_array_yields_no_readings() {
        let body = json!({"Temperatures": []});
        let readings = readings_from_body(&body, &SensorProfile::THERMAL, &settings()).unwrap();
        assert!(readings.is_empty());
    }

    #[test]
    fn missing_array_field_fails() {
        let body = json!({"Temperatures": []});
        let err = readings_from_body(&body, &SensorProfile::POWER, &settings()).unwrap_err();
        assert!(matches!(err, RedfishError::MissingField { ref field, .. } if field == "Voltages"));
    }

    #[test]
    fn array_field_of_wrong_type_fails() {
        let body = json!({"Fans": {"FanName": "Fan1"}});
        let err = readings_from_body(&body, &SensorProfile::FAN, &settings()).unwrap_err();
        assert!(matches!(err, RedfishError::InvalidField { expected: "an array", .. }));
    }

    #[test]
    fn one_bad_record_fails_the_whole_payload() {
        let body = json!({"Voltages": [
            {"Name": "12V", "ReadingVolts": 12.1},
            {"Name": "5V"}
        ]});
        let err = readings_from_body(&body, &SensorProfile::POWER, &settings()).unwrap_err();
        assert_eq!(err.to_string(), "missing field 'ReadingVolts' in Voltages[1]");
    }

    #[test]
    fn null_reading_is_not_a_number() {
        let body = json!({"Temperatures": [{"Name": "CPU1", "ReadingCelsius": null}]});
        let err = readings_from_body(&body, &SensorProfile::THERMAL, &settings()).unwrap_err();
        assert!(matches!(err, RedfishError::InvalidField { expected: "a number", .. }));
    }

    #[test]
    fn readings_collect_into_nested_map() {
        let body = json!({"Fans": [{"FanName": "Fan1", "ReadingRPM": 5000}]});
        let stats: StatMap = readings_from_body(&body, &SensorProfile::FAN, &settings())
            .unwrap()
            .into_iter()
            .collect();

        assert_eq!(
            stats.get("redfish", "host1", "fan", "Fan1"),
            Some(&StatValue::Bucket(HashMap::from([("fanspeed".to_string(), 5000.0)])))
        );
    }

    #[test]
    fn duplicate_names_are_disambiguated_by_member_id() {
        let body = json!({"Temperatures": [
            {"MemberId": "0", "Name": "CPU Temp", "ReadingCelsius": 50},
            {"MemberId": "1", "Name": "CPU Temp", "ReadingCelsius": 52}
        ]});
        let stats: StatMap = readings_from_body(&body, &SensorProfile::THERMAL, &settings())
            .unwrap()
            .into_iter()
            .collect();

        assert_eq!(stats.leaf_count(), 2);
        assert!(stats.get("redfish", "host1", "thermal", "CPU Temp").is_some());
        assert_eq!(
            stats.get("redfish", "host1", "thermal", "CPU Temp [1]"),
            Some(&StatValue::Bucket(HashMap::from([("temperature".to_string(), 52.0)])))
        );
    }

    #[test]
    fn duplicate_names_without_member_id_fall_back_to_index() {
        let body = json!({"Fans": [
            {"FanName": "Fan", "ReadingRPM": 4000},
            {"FanName": "Fan", "ReadingRPM": 4100},
            {"FanName": "Fan", "ReadingRPM": 4200}
        ]});
        let readings = readings_from_body(&body, &SensorProfile::FAN, &settings()).unwrap();
        let names: Vec<_> = readings.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Fan", "Fan [1]", "Fan [2]"]);

        let stats: StatMap = readings.into_iter().collect();
        assert_eq!(stats.leaf_count(), 3);
    }

    #[test]
    fn rejects_empty_endpoint() {
        let result = RedfishFetcher::new(" ", Credentials::None, SensorProfile::FAN, settings());
        assert!(matches!(result, Err(RedfishError::Config(_))));
    }

    #[test]
    fn fetcher_name_combines_prefix_and_profile() {
        let fetcher = RedfishFetcher::new(
            "https://bmc/redfish/v1/Chassis/1/Power",
            Credentials::None,
            SensorProfile::POWER,
            settings(),
        )
        .unwrap();
        assert_eq!(fetcher.name(), "redfish-power");
        assert_eq!(fetcher.endpoint(), "https://bmc/redfish/v1/Chassis/1/Power");
    }

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body, 201);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.len(), 200 + 3);
    }
}

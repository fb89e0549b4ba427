use std::borrow::Cow;

/// Describes how one sensor category is laid out in a Redfish payload.
///
/// The payload is expected to hold an array under [`field`](Self::field),
/// each element an object carrying a sensor name under
/// [`name_field`](Self::name_field) and a numeric reading under
/// [`value_field`](Self::value_field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorProfile {
    /// Category name, emitted as the plugin instance (e.g., `"fan"`).
    pub name: Cow<'static, str>,
    /// JSON array holding the sensor records (e.g., `"Fans"`).
    pub field: Cow<'static, str>,
    pub name_field: Cow<'static, str>,
    pub value_field: Cow<'static, str>,
    /// Metric type label attached to each reading (e.g., `"fanspeed"`).
    pub metric_type: Cow<'static, str>,
    /// Chassis sub-resource serving the array (e.g., `"Thermal"`).
    pub resource: Cow<'static, str>,
}

impl SensorProfile {
    pub const FAN: SensorProfile = SensorProfile {
        name: Cow::Borrowed("fan"),
        field: Cow::Borrowed("Fans"),
        name_field: Cow::Borrowed("FanName"),
        value_field: Cow::Borrowed("ReadingRPM"),
        metric_type: Cow::Borrowed("fanspeed"),
        resource: Cow::Borrowed("Thermal"),
    };

    pub const POWER: SensorProfile = SensorProfile {
        name: Cow::Borrowed("power"),
        field: Cow::Borrowed("Voltages"),
        name_field: Cow::Borrowed("Name"),
        value_field: Cow::Borrowed("ReadingVolts"),
        metric_type: Cow::Borrowed("voltage"),
        resource: Cow::Borrowed("Power"),
    };

    pub const THERMAL: SensorProfile = SensorProfile {
        name: Cow::Borrowed("thermal"),
        field: Cow::Borrowed("Temperatures"),
        name_field: Cow::Borrowed("Name"),
        value_field: Cow::Borrowed("ReadingCelsius"),
        metric_type: Cow::Borrowed("temperature"),
        resource: Cow::Borrowed("Thermal"),
    };

    /// Built-in profiles, polled when no plugin is configured explicitly.
    pub const BUILTIN: [SensorProfile; 3] = [Self::FAN, Self::POWER, Self::THERMAL];

    /// Looks up a built-in profile by name, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use rfmon_redfish::sensor::SensorProfile;
    ///
    /// assert_eq!(SensorProfile::builtin("Thermal"), Some(SensorProfile::THERMAL));
    /// assert_eq!(SensorProfile::builtin("humidity"), None);
    /// ```
    pub fn builtin(name: &str) -> Option<SensorProfile> {
        Self::BUILTIN
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn custom(
        name: impl Into<String>,
        field: impl Into<String>,
        name_field: impl Into<String>,
        value_field: impl Into<String>,
        metric_type: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            field: Cow::Owned(field.into()),
            name_field: Cow::Owned(name_field.into()),
            value_field: Cow::Owned(value_field.into()),
            metric_type: Cow::Owned(metric_type.into()),
            resource: Cow::Owned(resource.into()),
        }
    }
}

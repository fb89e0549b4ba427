/// Errors that can occur while fetching sensor data from a Redfish service.
///
/// Every variant aborts the whole fetch; no partial results are returned.
///
/// # Examples
///
/// ```rust
/// use rfmon_redfish::error::RedfishError;
///
/// let err = RedfishError::MissingField {
///     field: "ReadingRPM".to_string(),
///     context: "Fans[0]".to_string(),
/// };
/// assert!(err.to_string().contains("ReadingRPM"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RedfishError {
    /// Non-2xx status code from the Redfish service.
    #[error("Redfish HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    /// An underlying HTTP transport error from `reqwest`.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field the sensor profile depends on is absent from the payload.
    #[error("missing field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// A field is present but has the wrong JSON type.
    #[error("field '{field}' in {context} is not {expected}")]
    InvalidField {
        field: String,
        context: String,
        expected: &'static str,
    },

    /// Endpoint or credential configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, RedfishError>;

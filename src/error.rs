//! Structured error types for configuration resolution.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Unresolved keys
    MissingValue,
    ProviderCycle,
    AttributeNotFound,

    // Unsupported operations
    NotImplemented,

    // Failures inside a layer
    PromptFailed,
    ProviderFailed,
    InvalidConfig,
}

/// Structured error raised by the resolver and its collaborators.
#[derive(Debug, Serialize)]
pub struct ConfError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ConfError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            key: None,
            details: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing(name: &str, key: &str) -> Self {
        Self::new(
            ErrorCode::MissingValue,
            format!("Missing configuration value: {}", qualified(name, key)),
        )
        .with_key(key)
    }

    pub fn cycle(name: &str, key: &str) -> Self {
        Self::new(
            ErrorCode::ProviderCycle,
            format!(
                "Provider for {} requested its own value while being evaluated",
                qualified(name, key)
            ),
        )
        .with_key(key)
    }

    pub fn attribute_not_found(key: &str) -> Self {
        Self::new(
            ErrorCode::AttributeNotFound,
            format!("No such attribute: {}", key),
        )
        .with_key(key)
    }

    pub fn not_implemented(operation: &str) -> Self {
        Self::new(
            ErrorCode::NotImplemented,
            format!("Operation not supported: {}", operation),
        )
    }

    pub fn prompt_failed(key: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::PromptFailed,
            format!("Could not read a value for {}: {}", key, err),
        )
        .with_key(key)
    }

    pub fn provider_failed(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ProviderFailed, err.to_string())
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, reason)
    }

    /// True when the key could not be resolved (absent everywhere or re-entered
    /// while its provider was running).
    pub fn is_missing(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::MissingValue | ErrorCode::ProviderCycle
        )
    }

    /// Convert a lookup failure into the attribute-style variant.
    pub fn into_attribute_error(self) -> Self {
        match (self.is_missing(), self.key) {
            (true, Some(key)) => Self::attribute_not_found(&key),
            (_, key) => Self { key, ..self },
        }
    }
}

fn qualified(name: &str, key: &str) -> String {
    if name.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", name, key)
    }
}

impl fmt::Display for ConfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfError {}

// Lets provider bodies use ? on arbitrary errors
impl From<anyhow::Error> for ConfError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ConfError>() {
            Ok(conf_err) => conf_err,
            Err(err) => ConfError::provider_failed(format!("{:#}", err)),
        }
    }
}

impl From<serde_json::Error> for ConfError {
    fn from(err: serde_json::Error) -> Self {
        ConfError::invalid_config(err.to_string())
    }
}

/// Result type for resolver operations.
pub type ConfResult<T> = std::result::Result<T, ConfError>;

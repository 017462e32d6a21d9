//! TOML-backed configuration with validation and hot updates.

mod manager;
pub mod value;

pub use manager::ConfigManager;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("field `{field}` has wrong type, expected {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("field `{field}` value {value} out of range [{}, {}]",
        .min.as_deref().unwrap_or("-inf"), .max.as_deref().unwrap_or("+inf"))]
    OutOfRange {
        field: String,
        value: String,
        min: Option<String>,
        max: Option<String>,
    },

    #[error("missing required field `{0}`")]
    Missing(String),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

/// A configuration type that can be built from a parsed TOML document.
pub trait Config: Sized + Send + Sync + 'static {
    fn from_toml(value: &toml::Value) -> Result<Self, ConfigError>;

    /// Copy the fields that may change without a restart from `other`.
    fn hot_update(&mut self, other: &Self);

    /// Render back to TOML text.
    fn render(&self) -> String;

    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// A value parsed but is outside the accepted range.
    #[error("Invalid setting {key}: {reason}")]
    OutOfRange { key: String, reason: String },

    #[error("Failed to load env file {path}: {reason}")]
    EnvFile { path: String, reason: String },

    #[error("Could not determine a home directory for the default data dir")]
    NoHomeDir,
}

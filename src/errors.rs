use thiserror::Error;

/// Setup-time failures. These abort the process; request-time failures never
/// surface as a `ConfigError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "No API key found. Environment presence: OPENROUTER_API_KEY={openrouter_present}, \
         OPENAI_API_KEY={openai_present}. Set OPENROUTER_API_KEY or OPENAI_API_KEY \
         (do not paste the key into code)"
    )]
    MissingApiKey {
        openrouter_present: bool,
        openai_present: bool,
    },

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Template for {role} is missing a value for placeholder '{placeholder}'")]
    MissingPlaceholder { role: String, placeholder: String },

    #[error("Template for {role} failed to render: {reason}")]
    Template { role: String, reason: String },

    #[error("Unsupported stdout encoding: {0}")]
    UnknownEncoding(String),

    #[error("{var} must be a whole number of milliseconds, got '{value}'")]
    InvalidTimeout { var: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Unit {unit} has not joined endpoint {endpoint}")]
    UnitNotJoined { endpoint: String, unit: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid relation data: {message}")]
    InvalidRelationData { message: String },
}

impl IntegrationError {
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            IntegrationError::UnitNotJoined { .. } => {
                "Only publish to units reported by the relation's joined unit list"
            }
            IntegrationError::IoError(_) => "Check that the file exists and is readable",
            IntegrationError::SerializationError(_) => {
                "Check that the relation snapshot is valid JSON"
            }
            IntegrationError::ConfigError { .. }
            | IntegrationError::InvalidConfigValueError { .. } => {
                "Fix the provider TOML configuration and try again"
            }
            IntegrationError::MissingConfigError { .. } => {
                "Set the environment variable referenced by the field, or write the value inline"
            }
            IntegrationError::InvalidRelationData { .. } => {
                "Wait for the integrator to publish complete data"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, IntegrationError>;

use crate::utils::error::{IntegrationError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(IntegrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(IntegrationError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(IntegrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IntegrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// A value still holding a `${VAR}` placeholder was never resolved from the environment.
pub fn validate_resolved(field_name: &str, value: &str) -> Result<()> {
    let unresolved = value
        .find("${")
        .is_some_and(|start| value[start..].contains('}'));
    if unresolved {
        return Err(IntegrationError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}

/// An empty CA is allowed; anything else must decode as standard base64.
pub fn validate_base64(field_name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    STANDARD
        .decode(value)
        .map(|_| ())
        .map_err(|e| IntegrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            // certificates are long, keep the error line readable
            value: value.chars().take(16).collect(),
            reason: format!("Couldn't find base64 data: {}", e),
        })
}

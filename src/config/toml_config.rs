use crate::core::service::Fulfillment;
use crate::core::{BlockStorageConfig, Credentials, LbaasConfig, ProxyConfig};
use crate::utils::error::{IntegrationError, Result};
use crate::utils::validation::{
    validate_base64, validate_non_empty_string, validate_resolved, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str = "openstack";

/// Provider-side configuration: which endpoint to serve and what to answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    pub credentials: Credentials,
    pub lbaas: Option<LbaasConfig>,
    pub block_storage: Option<BlockStorageConfig>,
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(IntegrationError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| IntegrationError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| IntegrationError::ConfigError {
            message: format!("Invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!("Environment variable {} is not set", var_name);
                format!("${{{}}}", var_name)
            })
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("endpoint.name", &self.endpoint.name)?;

        let creds = &self.credentials;
        let required = [
            ("credentials.auth_url", &creds.auth_url),
            ("credentials.region", &creds.region),
            ("credentials.username", &creds.username),
            ("credentials.password", &creds.password),
            ("credentials.user_domain_name", &creds.user_domain_name),
            ("credentials.project_domain_name", &creds.project_domain_name),
            ("credentials.project_name", &creds.project_name),
        ];
        for (field, value) in required {
            validate_resolved(field, value)?;
        }

        validate_url("credentials.auth_url", &creds.auth_url)?;
        validate_non_empty_string("credentials.region", &creds.region)?;
        validate_non_empty_string("credentials.username", &creds.username)?;
        validate_non_empty_string("credentials.password", &creds.password)?;
        validate_non_empty_string("credentials.user_domain_name", &creds.user_domain_name)?;
        validate_non_empty_string("credentials.project_domain_name", &creds.project_domain_name)?;
        validate_non_empty_string("credentials.project_name", &creds.project_name)?;
        validate_base64("credentials.endpoint_tls_ca", &creds.endpoint_tls_ca)?;

        Ok(())
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint.name
    }

    pub fn fulfillment(&self) -> Fulfillment {
        Fulfillment {
            credentials: self.credentials.clone(),
            lbaas: self.lbaas.clone(),
            block_storage: self.block_storage.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

impl Validate for ProviderConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

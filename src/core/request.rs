use crate::core::{
    BlockStorageConfig, Credentials, Databag, LbaasConfig, ProxyConfig, RelationBus,
    BLOCK_STORAGE_KEY, CREDENTIALS_KEY, LBAAS_KEY, PROXY_CONFIG_KEY,
};
use crate::utils::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A request for integration from a single remote unit.
///
/// Holds no state of its own: every read and write goes through the unit's
/// outbound channel on the bus.
pub struct IntegrationRequest<'a, B: RelationBus + ?Sized> {
    bus: &'a B,
    unit_name: String,
}

impl<'a, B: RelationBus + ?Sized> IntegrationRequest<'a, B> {
    pub fn new(bus: &'a B, unit_name: impl Into<String>) -> Self {
        Self {
            bus,
            unit_name: unit_name.into(),
        }
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Whether credentials have been published via [`Self::set_credentials`].
    pub fn has_credentials(&self) -> bool {
        matches!(self.bus.get(&self.unit_name, CREDENTIALS_KEY), Ok(Some(_)))
    }

    /// Whether this request still waits for an answer.
    ///
    /// Completion is inferred from published output, so an identical
    /// re-request after an answer does not count as changed.
    pub fn is_changed(&self) -> bool {
        !self.has_credentials()
    }

    pub fn set_credentials(&self, credentials: &Credentials) -> Result<()> {
        self.publish(CREDENTIALS_KEY, credentials)
    }

    pub fn set_lbaas_config(&self, config: &LbaasConfig) -> Result<()> {
        self.publish(LBAAS_KEY, config)
    }

    pub fn set_block_storage_config(&self, config: &BlockStorageConfig) -> Result<()> {
        self.publish(BLOCK_STORAGE_KEY, config)
    }

    /// The proxy config previously answered on this request.
    ///
    /// Returns an empty map when nothing usable was published. Empty values
    /// (`null`, `false`, `0`, `""`, `[]`, `{}`) read as `""`; other scalars
    /// keep their JSON text.
    pub fn proxy_config(&self) -> ProxyConfig {
        let data = match self.bus.get(&self.unit_name, PROXY_CONFIG_KEY) {
            Ok(Some(Value::Object(data))) => data,
            Ok(Some(other)) => {
                tracing::warn!(
                    "Ignoring malformed proxy_config for {}: {}",
                    self.unit_name,
                    other
                );
                return ProxyConfig::new();
            }
            Ok(None) => return ProxyConfig::new(),
            Err(e) => {
                tracing::warn!("Cannot read proxy_config for {}: {}", self.unit_name, e);
                return ProxyConfig::new();
            }
        };

        data.into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::Null | Value::Bool(false) => String::new(),
                    Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
                    Value::Array(a) if a.is_empty() => String::new(),
                    Value::Object(o) if o.is_empty() => String::new(),
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()
    }

    /// Publishes the mapping verbatim; `None` values are kept as `null`.
    pub fn set_proxy_config<V: Serialize>(&self, proxy_config: &BTreeMap<String, V>) -> Result<()> {
        self.publish(PROXY_CONFIG_KEY, proxy_config)
    }

    fn publish<T: Serialize + ?Sized>(&self, key: &str, record: &T) -> Result<()> {
        let mut data = Databag::new();
        data.insert(key.to_string(), serde_json::to_value(record)?);
        tracing::debug!("Publishing {} to {}", key, self.unit_name);
        self.bus.update(&self.unit_name, data)
    }
}

impl<B: RelationBus + ?Sized> std::fmt::Debug for IntegrationRequest<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationRequest")
            .field("unit_name", &self.unit_name)
            .finish()
    }
}

//! Consumer-side reading of what the integrator publishes.
//!
//! A charm that asked for integration receives the same four records the
//! provider writes; this module validates them and renders the OpenStack
//! cloud-provider config from them.

use crate::core::{
    BlockStorageConfig, Credentials, Databag, LbaasConfig, ProxyConfig, RelationBus, CHANGED,
    JOINED,
};
use crate::utils::error::{IntegrationError, Result};
use crate::utils::validation::validate_base64;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const READY: &str = "ready";

/// Where the rendered config expects the endpoint CA to be written.
pub const CA_FILE_PATH: &str = "/etc/config/endpoint-ca.cert";

/// The integrator's answers as seen from the requiring side.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteData {
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub lbaas: Option<LbaasConfig>,
    #[serde(default)]
    pub block_storage: Option<BlockStorageConfig>,
    #[serde(default)]
    pub proxy_config: Option<BTreeMap<String, Option<String>>>,
}

impl RemoteData {
    pub fn from_databag(databag: &Databag) -> Result<Self> {
        let data: RemoteData = serde_json::from_value(Value::Object(databag.clone()))
            .map_err(|e| IntegrationError::InvalidRelationData {
                message: e.to_string(),
            })?;

        if let Some(credentials) = &data.credentials {
            validate_base64("credentials.endpoint_tls_ca", &credentials.endpoint_tls_ca).map_err(
                |e| IntegrationError::InvalidRelationData {
                    message: e.to_string(),
                },
            )?;
        }
        Ok(data)
    }

    /// Renders the `cloud.conf` consumed by the OpenStack cloud provider.
    pub fn cloud_config(&self) -> String {
        let mut global = IniSection::new("Global");
        if let Some(creds) = &self.credentials {
            global.push_non_empty("auth-url", &creds.auth_url);
            if !creds.endpoint_tls_ca.is_empty() {
                global.push("ca-file", CA_FILE_PATH);
            }
            global.push_non_empty("username", &creds.username);
            global.push_non_empty("password", &creds.password);
            global.push_non_empty("region", &creds.region);
            global.push_optional("domain-id", &creds.domain_id);
            global.push_optional("domain-name", &creds.domain_name);
            global.push_optional("tenant-id", &creds.project_id);
            global.push_non_empty("tenant-name", &creds.project_name);
            global.push_optional("tenant-domain-id", &creds.project_domain_id);
            global.push_non_empty("tenant-domain-name", &creds.project_domain_name);
            global.push_optional("user-domain-id", &creds.user_domain_id);
            global.push_non_empty("user-domain-name", &creds.user_domain_name);
        }

        let mut load_balancer = IniSection::new("LoadBalancer");
        let lbaas = self.lbaas.as_ref();
        if lbaas.and_then(|l| l.lb_enabled) != Some(true) {
            load_balancer.push("enabled", "false");
        }
        // Older integrators never report octavia; assume it is there.
        match lbaas.and_then(|l| l.has_octavia) {
            Some(true) | None => load_balancer.push("use-octavia", "true"),
            Some(false) => {
                load_balancer.push("use-octavia", "false");
                load_balancer.push("lb-provider", "haproxy");
            }
        }
        if let Some(lbaas) = lbaas {
            load_balancer.push_non_empty("subnet-id", &lbaas.subnet_id);
            load_balancer.push_non_empty("floating-network-id", &lbaas.floating_network_id);
            load_balancer.push_non_empty("lb-method", &lbaas.lb_method);
            load_balancer.push_flag("internal-lb", lbaas.internal_lb);
            load_balancer.push_flag("manage-security-groups", lbaas.manage_security_groups);
        }

        let mut block_storage = IniSection::new("BlockStorage");
        if let Some(bs) = &self.block_storage {
            block_storage.push_non_empty("bs-version", &bs.bs_version);
            block_storage.push_flag("trust-device-path", bs.trust_device_path);
            block_storage.push_flag("ignore-volume-az", bs.ignore_volume_az);
        }

        [global, load_balancer, block_storage]
            .iter()
            .map(IniSection::render)
            .collect()
    }
}

struct IniSection {
    name: &'static str,
    entries: Vec<(&'static str, String)>,
}

impl IniSection {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    fn push(&mut self, key: &'static str, value: &str) {
        self.entries.push((key, value.to_string()));
    }

    fn push_non_empty(&mut self, key: &'static str, value: &str) {
        if !value.is_empty() {
            self.push(key, value);
        }
    }

    fn push_optional(&mut self, key: &'static str, value: &Option<String>) {
        if let Some(value) = value {
            self.push_non_empty(key, value);
        }
    }

    fn push_flag(&mut self, key: &'static str, set: bool) {
        if set {
            self.push(key, "true");
        }
    }

    fn render(&self) -> String {
        let mut out = format!("[{}]\n", self.name);
        for (key, value) in &self.entries {
            out.push_str(&format!("{} = {}\n", key, value));
        }
        out.push('\n');
        out
    }
}

/// Requires side of the integration relation.
#[derive(Debug)]
pub struct IntegrationRequirer {
    endpoint: String,
    related: bool,
    data: Option<Result<RemoteData>>,
}

impl IntegrationRequirer {
    /// View over an existing relation.
    ///
    /// `databag` is `None` while the integrator has no unit on the relation yet.
    pub fn new(endpoint: impl Into<String>, databag: Option<&Databag>) -> Self {
        Self {
            endpoint: endpoint.into(),
            related: true,
            data: databag.map(RemoteData::from_databag),
        }
    }

    /// View for a charm that has no relation on `endpoint` at all.
    pub fn unrelated(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            related: false,
            data: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn ready_data(&self) -> Option<&RemoteData> {
        match &self.data {
            None => {
                tracing::error!("{} relation data not yet available.", self.endpoint);
                None
            }
            Some(Err(e)) => {
                tracing::error!("{} relation data not yet valid. ({})", self.endpoint, e);
                None
            }
            Some(Ok(data)) if data.credentials.is_some() => Some(data),
            Some(Ok(_)) => None,
        }
    }

    /// Whether the integrator has answered this unit's request.
    pub fn is_ready(&self) -> bool {
        self.ready_data().is_some()
    }

    /// Status message for the charm, `None` once ready.
    pub fn evaluate_relation(&self, relation_broken: bool) -> Option<String> {
        if self.is_ready() {
            return None;
        }
        if !self.related || relation_broken {
            Some(format!("Missing required {}", self.endpoint))
        } else {
            Some(format!("Waiting for {}", self.endpoint))
        }
    }

    pub fn cloud_conf(&self) -> Option<String> {
        self.ready_data().map(RemoteData::cloud_config)
    }

    pub fn cloud_conf_b64(&self) -> Option<String> {
        self.cloud_conf().map(|conf| STANDARD.encode(conf))
    }

    /// The CA bundle as published, still base64 encoded.
    pub fn endpoint_tls_ca(&self) -> Option<Vec<u8>> {
        self.ready_data()
            .and_then(|data| data.credentials.as_ref())
            .filter(|creds| !creds.endpoint_tls_ca.is_empty())
            .map(|creds| creds.endpoint_tls_ca.as_bytes().to_vec())
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        self.ready_data()
            .and_then(|data| data.proxy_config.as_ref())
            .map(|proxy| {
                proxy
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Handler for the requiring endpoint's `joined` notification: asks the
    /// integrator unit for credentials by naming the consuming application.
    pub fn joined<B: RelationBus + ?Sized>(
        &self,
        bus: &B,
        unit: &str,
        app_name: &str,
    ) -> Result<()> {
        let mut data = Databag::new();
        data.insert("charm".to_string(), Value::String(app_name.to_string()));
        tracing::debug!("Requesting integration from {} as {}", unit, app_name);
        bus.update(unit, data)
    }

    /// Drops `ready` once no integrator unit is joined any more.
    pub fn remove_ready<B: RelationBus + ?Sized>(&self, bus: &B) -> bool {
        if bus.is_flag_set(&bus.expand_name(JOINED)) {
            return false;
        }
        bus.clear_flag(&bus.expand_name(READY));
        true
    }

    /// Handler for the requiring endpoint's `changed` notification.
    pub fn check_ready<B: RelationBus + ?Sized>(&self, bus: &B) -> bool {
        let ready = self.is_ready();
        bus.toggle_flag(&bus.expand_name(READY), ready);
        bus.clear_flag(&bus.expand_name(CHANGED));
        ready
    }
}

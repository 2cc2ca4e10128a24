use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Channel key of the credentials record. Its presence marks a request as answered.
pub const CREDENTIALS_KEY: &str = "credentials";
pub const LBAAS_KEY: &str = "lbaas";
pub const BLOCK_STORAGE_KEY: &str = "block_storage";
pub const PROXY_CONFIG_KEY: &str = "proxy_config";

/// Outbound (or inbound) key/value data for one unit.
pub type Databag = serde_json::Map<String, serde_json::Value>;

/// Proxy settings as read back from a channel.
pub type ProxyConfig = BTreeMap<String, String>;

/// Keystone credentials handed to a consumer unit.
///
/// The eight leading fields are required; the domain/id fields and `version`
/// are published as `null` until the caller sets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub auth_url: String,
    pub region: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub endpoint_tls_ca: String,
    pub project_domain_name: String,
    #[serde(default)]
    pub project_domain_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    pub project_name: String,
    #[serde(default)]
    pub user_domain_id: Option<String>,
    pub user_domain_name: String,
    #[serde(default)]
    pub version: Option<u32>,
}

impl Credentials {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth_url: impl Into<String>,
        region: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        user_domain_name: impl Into<String>,
        project_domain_name: impl Into<String>,
        project_name: impl Into<String>,
        endpoint_tls_ca: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            region: region.into(),
            username: username.into(),
            password: password.into(),
            domain_id: None,
            domain_name: None,
            endpoint_tls_ca: endpoint_tls_ca.into(),
            project_domain_name: project_domain_name.into(),
            project_domain_id: None,
            project_id: None,
            project_name: project_name.into(),
            user_domain_id: None,
            user_domain_name: user_domain_name.into(),
            version: None,
        }
    }

    pub fn with_domain_id(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = Some(domain_id.into());
        self
    }

    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_project_domain_id(mut self, project_domain_id: impl Into<String>) -> Self {
        self.project_domain_id = Some(project_domain_id.into());
        self
    }

    pub fn with_user_domain_id(mut self, user_domain_id: impl Into<String>) -> Self {
        self.user_domain_id = Some(user_domain_id.into());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// Load-balancer-as-a-service answer.
///
/// `has_octavia` and `lb_enabled` stay `None` while the integrator has not
/// decided; consumers must not read `None` as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbaasConfig {
    pub subnet_id: String,
    pub floating_network_id: String,
    pub lb_method: String,
    #[serde(default)]
    pub internal_lb: bool,
    pub manage_security_groups: bool,
    #[serde(default)]
    pub has_octavia: Option<bool>,
    #[serde(default)]
    pub lb_enabled: Option<bool>,
}

impl LbaasConfig {
    pub fn new(
        subnet_id: impl Into<String>,
        floating_network_id: impl Into<String>,
        lb_method: impl Into<String>,
        manage_security_groups: bool,
    ) -> Self {
        Self {
            subnet_id: subnet_id.into(),
            floating_network_id: floating_network_id.into(),
            lb_method: lb_method.into(),
            internal_lb: false,
            manage_security_groups,
            has_octavia: None,
            lb_enabled: None,
        }
    }

    pub fn with_has_octavia(mut self, has_octavia: bool) -> Self {
        self.has_octavia = Some(has_octavia);
        self
    }

    pub fn with_lb_enabled(mut self, lb_enabled: bool) -> Self {
        self.lb_enabled = Some(lb_enabled);
        self
    }

    pub fn with_internal_lb(mut self, internal_lb: bool) -> Self {
        self.internal_lb = internal_lb;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStorageConfig {
    pub bs_version: String,
    pub trust_device_path: bool,
    pub ignore_volume_az: bool,
}

impl BlockStorageConfig {
    pub fn new(bs_version: impl Into<String>, trust_device_path: bool, ignore_volume_az: bool) -> Self {
        Self {
            bs_version: bs_version.into(),
            trust_device_path,
            ignore_volume_az,
        }
    }
}

/// Pending signal of one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    Quiescent,
    Pending,
}

impl PendingState {
    pub fn from_flag(raised: bool) -> Self {
        if raised {
            PendingState::Pending
        } else {
            PendingState::Quiescent
        }
    }

    pub fn is_pending(self) -> bool {
        self == PendingState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials::new(
            "https://keystone.example:5000/v3",
            "RegionOne",
            "admin",
            "s3cret",
            "Default",
            "Default",
            "k8s",
            "",
        )
    }

    #[test]
    fn test_credentials_publish_all_fourteen_fields() {
        let value = serde_json::to_value(credentials()).unwrap();
        let fields = value.as_object().unwrap();

        assert_eq!(fields.len(), 14);
        for optional in [
            "domain_id",
            "domain_name",
            "project_id",
            "project_domain_id",
            "user_domain_id",
            "version",
        ] {
            assert_eq!(fields[optional], serde_json::Value::Null, "{optional}");
        }
        assert_eq!(fields["auth_url"], json!("https://keystone.example:5000/v3"));
    }

    #[test]
    fn test_credentials_builders() {
        let creds = credentials().with_domain_name("admin_domain").with_version(3);
        let value = serde_json::to_value(&creds).unwrap();

        assert_eq!(value["domain_name"], json!("admin_domain"));
        assert_eq!(value["version"], json!(3));
    }

    #[test]
    fn test_lbaas_defaults_keep_undecided_fields_null() {
        let lbaas = LbaasConfig::new("subnet-1", "ext-net", "ROUND_ROBIN", true);
        let value = serde_json::to_value(&lbaas).unwrap();

        assert_eq!(value["internal_lb"], json!(false));
        assert_eq!(value["has_octavia"], serde_json::Value::Null);
        assert_eq!(value["lb_enabled"], serde_json::Value::Null);
        assert_eq!(value.as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_lbaas_reads_missing_optionals_as_undecided() {
        let lbaas: LbaasConfig = serde_json::from_value(json!({
            "subnet_id": "subnet-1",
            "floating_network_id": "ext-net",
            "lb_method": "ROUND_ROBIN",
            "manage_security_groups": false
        }))
        .unwrap();

        assert_eq!(lbaas.has_octavia, None);
        assert_eq!(lbaas.lb_enabled, None);
        assert!(!lbaas.internal_lb);
    }

    #[test]
    fn test_pending_state_from_flag() {
        assert!(PendingState::from_flag(true).is_pending());
        assert_eq!(PendingState::from_flag(false), PendingState::Quiescent);
    }
}

use crate::core::registry::RequestRegistry;
use crate::core::request::IntegrationRequest;
use crate::core::{
    BlockStorageConfig, Credentials, LbaasConfig, PendingState, ProxyConfig, RelationBus, CHANGED,
    REQUESTS_PENDING,
};
use crate::utils::error::Result;

/// The answers the integrator hands to every requesting unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Fulfillment {
    pub credentials: Credentials,
    pub lbaas: Option<LbaasConfig>,
    pub block_storage: Option<BlockStorageConfig>,
    pub proxy: Option<ProxyConfig>,
}

impl Fulfillment {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            lbaas: None,
            block_storage: None,
            proxy: None,
        }
    }

    /// Publishes every configured answer; credentials last, so a failed
    /// write leaves the request still counted as new.
    pub fn apply<B: RelationBus + ?Sized>(&self, request: &IntegrationRequest<'_, B>) -> Result<()> {
        if let Some(lbaas) = &self.lbaas {
            request.set_lbaas_config(lbaas)?;
        }
        if let Some(block_storage) = &self.block_storage {
            request.set_block_storage_config(block_storage)?;
        }
        if let Some(proxy) = &self.proxy {
            request.set_proxy_config(proxy)?;
        }
        request.set_credentials(&self.credentials)
    }
}

/// Outcome of one [`IntegrationService::run`] pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub evaluated: bool,
    pub fulfilled: Vec<String>,
    pub state: PendingState,
}

/// The integrator's fulfillment loop over one endpoint.
pub struct IntegrationService {
    fulfillment: Fulfillment,
}

impl IntegrationService {
    pub fn new(fulfillment: Fulfillment) -> Self {
        Self { fulfillment }
    }

    pub fn fulfillment(&self) -> &Fulfillment {
        &self.fulfillment
    }

    /// Runs one dispatch pass against the bus.
    ///
    /// A raised `changed` flag is evaluated first; if that leaves
    /// `requests-pending` raised, every new request is answered and the
    /// endpoint is marked completed.
    pub fn run<B: RelationBus + ?Sized>(&self, bus: &B) -> Result<CycleReport> {
        let mut evaluated = false;
        if bus.is_flag_set(&bus.expand_name(CHANGED)) {
            RequestRegistry::new(bus).on_relation_changed();
            evaluated = true;
        }

        let mut fulfilled = Vec::new();
        if bus.is_flag_set(&bus.expand_name(REQUESTS_PENDING)) {
            let registry = RequestRegistry::new(bus);
            for request in registry.new_requests() {
                tracing::info!("Fulfilling integration request from {}", request.unit_name());
                self.fulfillment.apply(request)?;
                fulfilled.push(request.unit_name().to_string());
            }
            registry.mark_completed();
        } else {
            tracing::debug!("No pending requests on {}", bus.endpoint_name());
        }

        let state = PendingState::from_flag(bus.is_flag_set(&bus.expand_name(REQUESTS_PENDING)));
        Ok(CycleReport {
            evaluated,
            fulfilled,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRelation;
    use crate::utils::error::IntegrationError;
    use serde_json::json;

    fn fulfillment() -> Fulfillment {
        let mut proxy = ProxyConfig::new();
        proxy.insert("HTTPS_PROXY".to_string(), "http://squid.internal:3128".to_string());

        Fulfillment {
            lbaas: Some(LbaasConfig::new("subnet-1", "ext-net", "ROUND_ROBIN", true)),
            block_storage: Some(BlockStorageConfig::new("v3", false, true)),
            proxy: Some(proxy),
            ..Fulfillment::new(Credentials::new(
                "https://keystone.example:5000/v3",
                "RegionOne",
                "admin",
                "s3cret",
                "Default",
                "Default",
                "k8s",
                "",
            ))
        }
    }

    #[test]
    fn test_run_without_changes_is_a_no_op() {
        let relation = MemoryRelation::new("openstack");
        let report = IntegrationService::new(fulfillment()).run(&relation).unwrap();

        assert!(!report.evaluated);
        assert!(report.fulfilled.is_empty());
        assert_eq!(report.state, PendingState::Quiescent);
    }

    #[test]
    fn test_run_answers_new_units_once() {
        let relation = MemoryRelation::new("openstack");
        relation.join("kubernetes-worker/0");
        relation.join("kubernetes-control-plane/0");
        let service = IntegrationService::new(fulfillment());

        let report = service.run(&relation).unwrap();
        assert!(report.evaluated);
        assert_eq!(report.fulfilled, ["kubernetes-worker/0", "kubernetes-control-plane/0"]);
        assert_eq!(report.state, PendingState::Quiescent);

        let published = relation.published("kubernetes-worker/0").unwrap();
        assert_eq!(published["credentials"]["region"], json!("RegionOne"));
        assert_eq!(published["lbaas"]["manage_security_groups"], json!(true));
        assert_eq!(published["block_storage"]["ignore_volume_az"], json!(true));
        assert_eq!(
            published["proxy_config"]["HTTPS_PROXY"],
            json!("http://squid.internal:3128")
        );

        relation.join("kubernetes-worker/1");
        let report = service.run(&relation).unwrap();
        assert_eq!(report.fulfilled, ["kubernetes-worker/1"]);
    }

    #[test]
    fn test_apply_without_optional_answers_sets_only_credentials() {
        let relation = MemoryRelation::new("openstack");
        relation.join("kubernetes-worker/0");
        let request = IntegrationRequest::new(&relation, "kubernetes-worker/0");

        Fulfillment::new(fulfillment().credentials).apply(&request).unwrap();

        let published = relation.published("kubernetes-worker/0").unwrap();
        assert_eq!(published.len(), 1);
        assert!(request.has_credentials());
    }

    #[test]
    fn test_apply_to_departed_unit_fails() {
        let relation = MemoryRelation::new("openstack");
        let request = IntegrationRequest::new(&relation, "kubernetes-worker/0");

        let err = fulfillment().apply(&request).unwrap_err();
        assert!(matches!(err, IntegrationError::UnitNotJoined { .. }));
    }
}

use crate::domain::model::Databag;
use crate::domain::ports::{RelationBus, CHANGED, JOINED};
use crate::utils::error::{IntegrationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;

/// Serializable state of one endpoint: joined units with their channels, plus raised flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationSnapshot {
    pub endpoint: String,
    #[serde(default)]
    pub units: Vec<UnitSnapshot>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub name: String,
    /// Data the remote unit sent to us.
    #[serde(default)]
    pub received: Databag,
    /// Data we publish to the remote unit.
    #[serde(default)]
    pub published: Databag,
}

/// Single-threaded in-memory relation bus.
///
/// Stands in for the real event framework in tests and in the CLI, which
/// loads and stores its state as a [`RelationSnapshot`].
#[derive(Debug, Default)]
pub struct MemoryRelation {
    endpoint: String,
    state: RefCell<RelationState>,
}

#[derive(Debug, Default)]
struct RelationState {
    units: Vec<UnitSnapshot>,
    flags: BTreeSet<String>,
}

impl MemoryRelation {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            state: RefCell::default(),
        }
    }

    /// Rebuilds a relation from saved state.
    ///
    /// Rejects a snapshot without an endpoint name or one that lists the
    /// same unit twice; each joined unit owns exactly one channel.
    pub fn from_snapshot(snapshot: RelationSnapshot) -> Result<Self> {
        if snapshot.endpoint.trim().is_empty() {
            return Err(IntegrationError::InvalidRelationData {
                message: "relation snapshot has no endpoint name".to_string(),
            });
        }

        let mut seen = BTreeSet::new();
        for unit in &snapshot.units {
            if !seen.insert(unit.name.as_str()) {
                return Err(IntegrationError::InvalidRelationData {
                    message: format!(
                        "unit {} is listed more than once on {}",
                        unit.name, snapshot.endpoint
                    ),
                });
            }
        }

        Ok(Self {
            endpoint: snapshot.endpoint,
            state: RefCell::new(RelationState {
                units: snapshot.units,
                flags: snapshot.flags,
            }),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let snapshot: RelationSnapshot = serde_json::from_str(&content)?;
        Self::from_snapshot(snapshot)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn snapshot(&self) -> RelationSnapshot {
        let state = self.state.borrow();
        RelationSnapshot {
            endpoint: self.endpoint.clone(),
            units: state.units.clone(),
            flags: state.flags.clone(),
        }
    }

    /// A remote unit joins; it is appended after every unit already joined.
    pub fn join(&self, unit: &str) {
        {
            let mut state = self.state.borrow_mut();
            if state.units.iter().any(|u| u.name == unit) {
                return;
            }
            state.units.push(UnitSnapshot {
                name: unit.to_string(),
                ..UnitSnapshot::default()
            });
        }
        tracing::debug!("{} joined {}", unit, self.endpoint);
        self.set_flag(&self.expand_name(JOINED));
        self.notify_changed();
    }

    /// A remote unit departs and its channel is dropped with it.
    pub fn depart(&self, unit: &str) {
        let remaining = {
            let mut state = self.state.borrow_mut();
            let before = state.units.len();
            state.units.retain(|u| u.name != unit);
            if state.units.len() == before {
                return;
            }
            state.units.len()
        };
        tracing::debug!("{} departed {}", unit, self.endpoint);
        if remaining == 0 {
            self.clear_flag(&self.expand_name(JOINED));
        }
        self.notify_changed();
    }

    /// Inbound data from a remote unit; raises `changed`.
    pub fn receive(&self, unit: &str, data: Databag) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let entry = state
                .units
                .iter_mut()
                .find(|u| u.name == unit)
                .ok_or_else(|| self.not_joined(unit))?;
            entry.received.extend(data);
        }
        self.notify_changed();
        Ok(())
    }

    pub fn notify_changed(&self) {
        self.set_flag(&self.expand_name(CHANGED));
    }

    /// Everything published to `unit` so far.
    pub fn published(&self, unit: &str) -> Option<Databag> {
        self.state
            .borrow()
            .units
            .iter()
            .find(|u| u.name == unit)
            .map(|u| u.published.clone())
    }

    pub fn received(&self, unit: &str) -> Option<Databag> {
        self.state
            .borrow()
            .units
            .iter()
            .find(|u| u.name == unit)
            .map(|u| u.received.clone())
    }

    fn not_joined(&self, unit: &str) -> IntegrationError {
        IntegrationError::UnitNotJoined {
            endpoint: self.endpoint.clone(),
            unit: unit.to_string(),
        }
    }
}

impl RelationBus for MemoryRelation {
    fn endpoint_name(&self) -> &str {
        &self.endpoint
    }

    fn joined_units(&self) -> Vec<String> {
        self.state
            .borrow()
            .units
            .iter()
            .map(|u| u.name.clone())
            .collect()
    }

    fn update(&self, unit: &str, data: Databag) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .units
            .iter_mut()
            .find(|u| u.name == unit)
            .ok_or_else(|| self.not_joined(unit))?;
        entry.published.extend(data);
        Ok(())
    }

    fn get(&self, unit: &str, key: &str) -> Result<Option<Value>> {
        let state = self.state.borrow();
        let entry = state
            .units
            .iter()
            .find(|u| u.name == unit)
            .ok_or_else(|| self.not_joined(unit))?;
        Ok(entry.published.get(key).cloned())
    }

    fn set_flag(&self, flag: &str) {
        self.state.borrow_mut().flags.insert(flag.to_string());
    }

    fn clear_flag(&self, flag: &str) {
        self.state.borrow_mut().flags.remove(flag);
    }

    fn is_flag_set(&self, flag: &str) -> bool {
        self.state.borrow().flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn data(key: &str, value: Value) -> Databag {
        let mut data = Databag::new();
        data.insert(key.to_string(), value);
        data
    }

    #[test]
    fn test_join_raises_joined_and_changed() {
        let relation = MemoryRelation::new("openstack");
        relation.join("kubernetes-worker/0");
        relation.join("kubernetes-worker/0");

        assert_eq!(relation.joined_units(), ["kubernetes-worker/0"]);
        assert!(relation.is_flag_set("endpoint.openstack.joined"));
        assert!(relation.is_flag_set("endpoint.openstack.changed"));
    }

    #[test]
    fn test_depart_drops_channel() {
        let relation = MemoryRelation::new("openstack");
        relation.join("kubernetes-worker/0");
        relation
            .update("kubernetes-worker/0", data("credentials", json!({})))
            .unwrap();
        relation.clear_flag("endpoint.openstack.changed");

        relation.depart("kubernetes-worker/0");

        assert!(relation.joined_units().is_empty());
        assert!(relation.published("kubernetes-worker/0").is_none());
        assert!(!relation.is_flag_set("endpoint.openstack.joined"));
        assert!(relation.is_flag_set("endpoint.openstack.changed"));
    }

    #[test]
    fn test_update_replaces_keys_and_keeps_others() {
        let relation = MemoryRelation::new("openstack");
        relation.join("kubernetes-worker/0");
        relation
            .update("kubernetes-worker/0", data("lbaas", json!({"subnet_id": "a"})))
            .unwrap();
        relation
            .update("kubernetes-worker/0", data("credentials", json!({"region": "r1"})))
            .unwrap();
        relation
            .update("kubernetes-worker/0", data("lbaas", json!({"lb_method": "b"})))
            .unwrap();

        let published = relation.published("kubernetes-worker/0").unwrap();
        assert_eq!(published["lbaas"], json!({"lb_method": "b"}));
        assert_eq!(published["credentials"], json!({"region": "r1"}));
        assert_eq!(
            relation.get("kubernetes-worker/0", "credentials").unwrap(),
            Some(json!({"region": "r1"}))
        );
        assert_eq!(relation.get("kubernetes-worker/0", "proxy_config").unwrap(), None);
    }

    #[test]
    fn test_unjoined_unit_is_rejected() {
        let relation = MemoryRelation::new("openstack");

        assert!(matches!(
            relation.update("ghost/0", Databag::new()),
            Err(IntegrationError::UnitNotJoined { .. })
        ));
        assert!(relation.get("ghost/0", "credentials").is_err());
        assert!(relation.receive("ghost/0", Databag::new()).is_err());
    }

    #[test]
    fn test_receive_raises_changed() {
        let relation = MemoryRelation::new("openstack");
        relation.join("kubernetes-worker/0");
        relation.clear_flag("endpoint.openstack.changed");

        relation
            .receive("kubernetes-worker/0", data("charm", json!("kubernetes-worker")))
            .unwrap();

        assert!(relation.is_flag_set("endpoint.openstack.changed"));
        assert_eq!(
            relation.received("kubernetes-worker/0").unwrap()["charm"],
            json!("kubernetes-worker")
        );
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("relation.json");

        let relation = MemoryRelation::new("openstack");
        relation.join("kubernetes-worker/0");
        relation.save(&path).unwrap();

        let loaded = MemoryRelation::from_file(&path).unwrap();
        assert_eq!(loaded.snapshot(), relation.snapshot());
        assert_eq!(loaded.endpoint_name(), "openstack");
    }

    #[test]
    fn test_snapshot_without_endpoint_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("relation.json");
        std::fs::write(&path, r#"{"endpoint": "", "units": []}"#).unwrap();

        assert!(matches!(
            MemoryRelation::from_file(&path),
            Err(IntegrationError::InvalidRelationData { .. })
        ));
    }

    #[test]
    fn test_snapshot_with_duplicate_unit_is_rejected() {
        let unit = UnitSnapshot {
            name: "kubernetes-worker/0".to_string(),
            ..UnitSnapshot::default()
        };
        let snapshot = RelationSnapshot {
            endpoint: "openstack".to_string(),
            units: vec![unit.clone(), unit],
            flags: ["endpoint.openstack.changed".to_string()].into_iter().collect(),
        };
        assert!(matches!(
            MemoryRelation::from_snapshot(snapshot),
            Err(IntegrationError::InvalidRelationData { .. })
        ));

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("relation.json");
        std::fs::write(
            &path,
            r#"{"endpoint": "openstack", "units": [{"name": "w/0"}, {"name": "w/1"}, {"name": "w/0"}]}"#,
        )
        .unwrap();
        let err = MemoryRelation::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("w/0"));
    }
}

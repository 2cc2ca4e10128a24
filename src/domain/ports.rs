use crate::domain::model::Databag;
use crate::utils::error::Result;
use serde_json::Value;

pub const REQUESTS_PENDING: &str = "requests-pending";
pub const CHANGED: &str = "changed";
pub const JOINED: &str = "joined";

/// The relation/event bus one endpoint of the integrator is wired to.
///
/// Methods take `&self`: requests built from one bus write to it side by
/// side, so implementations keep their state behind interior mutability.
pub trait RelationBus {
    fn endpoint_name(&self) -> &str;

    /// Remote units currently joined, oldest join first.
    fn joined_units(&self) -> Vec<String>;

    /// Key-level merge into the outbound channel of `unit`; each key is replaced whole.
    fn update(&self, unit: &str, data: Databag) -> Result<()>;

    /// Reads one key from the outbound channel of `unit`.
    fn get(&self, unit: &str, key: &str) -> Result<Option<Value>>;

    fn set_flag(&self, flag: &str);

    fn clear_flag(&self, flag: &str);

    fn is_flag_set(&self, flag: &str) -> bool;

    fn toggle_flag(&self, flag: &str, value: bool) {
        if value {
            self.set_flag(flag);
        } else {
            self.clear_flag(flag);
        }
    }

    /// `endpoint.{endpoint_name}.{suffix}`
    fn expand_name(&self, suffix: &str) -> String {
        format!("endpoint.{}.{}", self.endpoint_name(), suffix)
    }
}

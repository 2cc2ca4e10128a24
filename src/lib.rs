pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::memory::{MemoryRelation, RelationSnapshot};
pub use config::ProviderConfig;
pub use crate::core::{
    registry::RequestRegistry,
    request::IntegrationRequest,
    requirer::{IntegrationRequirer, RemoteData},
    service::{CycleReport, Fulfillment, IntegrationService},
};
pub use domain::model::{
    BlockStorageConfig, Credentials, Databag, LbaasConfig, PendingState, ProxyConfig,
};
pub use domain::ports::RelationBus;
pub use utils::error::{IntegrationError, Result};

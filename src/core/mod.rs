pub mod registry;
pub mod request;
pub mod requirer;
pub mod service;

pub use crate::domain::model::{
    BlockStorageConfig, Credentials, Databag, LbaasConfig, PendingState, ProxyConfig,
    BLOCK_STORAGE_KEY, CREDENTIALS_KEY, LBAAS_KEY, PROXY_CONFIG_KEY,
};
pub use crate::domain::ports::{RelationBus, CHANGED, JOINED, REQUESTS_PENDING};
pub use crate::utils::error::Result;

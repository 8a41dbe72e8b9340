pub mod provider;
pub mod local;

pub use provider::*;
pub use local::*;

use std::sync::Arc;

use crate::config::StorageConfig;

/// Build the blob byte store configured for this process
pub fn blob_provider(config: &StorageConfig) -> Arc<dyn StorageProvider> {
    Arc::new(LocalStorage::new(&config.blob_path))
}

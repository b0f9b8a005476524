//! Repository adapters for persistence layer

use std::path::Path;

use tracing::info;
use towcheck_infra::persistence::{FilePendingQueue, FileSpecRegistry, FileWeighResultRepository};
use towcheck_infra::registry_loader::RegistrySeed;
use towcheck_types::Result;

use crate::config::Config;

/// Open the verified registry, importing the configured seed when it is empty
pub fn open_spec_registry(config: &Config) -> Result<FileSpecRegistry> {
    let registry = FileSpecRegistry::open(&config.store_dir()?)?;
    if let Some(ref seed_path) = config.registry_seed {
        if registry.is_empty()? {
            let seed = RegistrySeed::load_from_file(seed_path)?;
            let count = registry.upsert_all(seed.into_records())?;
            info!(count, seed = %seed_path.display(), "seeded empty registry");
        }
    }
    Ok(registry)
}

/// Open the admin review queue
pub fn open_pending_queue(config: &Config) -> Result<FilePendingQueue> {
    FilePendingQueue::open(&config.store_dir()?)
}

/// Open the sealed weigh result store
pub fn open_weigh_result_repo(config: &Config) -> Result<FileWeighResultRepository> {
    FileWeighResultRepository::open(&config.store_dir()?)
}

/// Open the registry at a custom directory, without seeding
pub fn open_spec_registry_at(store_dir: &Path) -> Result<FileSpecRegistry> {
    FileSpecRegistry::open(store_dir)
}

/// Open the review queue at a custom directory
pub fn open_pending_queue_at(store_dir: &Path) -> Result<FilePendingQueue> {
    FilePendingQueue::open(store_dir)
}

/// Open the weigh result store at a custom directory
pub fn open_weigh_result_repo_at(store_dir: &Path) -> Result<FileWeighResultRepository> {
    FileWeighResultRepository::open(store_dir)
}

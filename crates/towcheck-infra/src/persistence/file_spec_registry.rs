//! File-based verified specification registry

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};
use towcheck_domain::model::{SpecKey, SpecKind, StoredSpec};
use towcheck_domain::repository::{ensure_verified, SpecRegistry};
use towcheck_types::{Error, Result};

use super::json_file;

/// Registry stored as `registry.json`, keyed by kind-qualified identity
pub struct FileSpecRegistry {
    store_path: PathBuf,
    specs: Mutex<BTreeMap<String, StoredSpec>>,
}

impl FileSpecRegistry {
    /// Create or load the registry in `store_dir`
    pub fn open(store_dir: &Path) -> Result<Self> {
        fs::create_dir_all(store_dir)?;
        let store_path = store_dir.join("registry.json");
        let specs: BTreeMap<String, StoredSpec> = json_file::load(&store_path)?;
        debug!(path = %store_path.display(), records = specs.len(), "opened spec registry");
        Ok(Self {
            store_path,
            specs: Mutex::new(specs),
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Upsert many verified records with a single write; returns how many were stored
    pub fn upsert_all(&self, records: Vec<StoredSpec>) -> Result<usize> {
        for record in &records {
            ensure_verified(record)?;
        }
        let mut specs = json_file::lock(&self.specs, "registry")?;
        let count = records.len();
        json_file::commit(&self.store_path, &mut *specs, |next| {
            for record in records {
                next.insert(record.identity(), record);
            }
        })?;
        info!(count, "registry updated");
        Ok(count)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(json_file::lock(&self.specs, "registry")?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl SpecRegistry for FileSpecRegistry {
    fn lookup_spec(&self, kind: SpecKind, key: &SpecKey) -> std::result::Result<Option<StoredSpec>, Error> {
        let specs = json_file::lock(&self.specs, "registry")?;
        let mut matches = specs
            .values()
            .filter(|s| s.kind() == kind && s.key().matches_descriptor(key));
        // A model-level entry beats one registered against a particular plate
        let first = matches.next();
        let model_level = first
            .filter(|s| s.key().plate.is_none())
            .or_else(|| matches.find(|s| s.key().plate.is_none()));
        Ok(model_level.or(first).cloned())
    }

    fn lookup_spec_by_plate(
        &self,
        kind: SpecKind,
        plate: &str,
        state: &str,
    ) -> std::result::Result<Option<StoredSpec>, Error> {
        let specs = json_file::lock(&self.specs, "registry")?;
        Ok(specs
            .values()
            .find(|s| s.kind() == kind && s.key().matches_plate(plate, state))
            .cloned())
    }

    fn upsert_verified_spec(&self, record: StoredSpec) -> std::result::Result<(), Error> {
        ensure_verified(&record)?;
        let mut specs = json_file::lock(&self.specs, "registry")?;
        let identity = record.identity();
        json_file::commit(&self.store_path, &mut *specs, |next| {
            next.insert(identity.clone(), record);
        })?;
        info!(%identity, "registry record upserted");
        Ok(())
    }

    fn find_all(&self) -> std::result::Result<Vec<StoredSpec>, Error> {
        let specs = json_file::lock(&self.specs, "registry")?;
        Ok(specs.values().cloned().collect())
    }
}

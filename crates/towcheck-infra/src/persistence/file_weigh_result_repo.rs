//! File-based store of sealed weigh results

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};
use towcheck_domain::model::WeighResult;
use towcheck_domain::repository::WeighResultRepository;
use towcheck_types::{Error, Result, StoreError};

use super::json_file;

/// Insert-only result history stored as `weigh_results.json`
pub struct FileWeighResultRepository {
    store_path: PathBuf,
    results: Mutex<BTreeMap<String, WeighResult>>,
}

impl FileWeighResultRepository {
    /// Create or load the store. Every loaded result must still match its digest.
    pub fn open(store_dir: &Path) -> Result<Self> {
        fs::create_dir_all(store_dir)?;
        let store_path = store_dir.join("weigh_results.json");
        let results: BTreeMap<String, WeighResult> = json_file::load(&store_path)?;
        if let Some(tampered) = results.values().find(|r| !r.verify()) {
            return Err(StoreError::Corrupted(format!(
                "weigh result {} does not match its digest",
                tampered.id
            ))
            .into());
        }
        debug!(path = %store_path.display(), records = results.len(), "opened weigh result store");
        Ok(Self {
            store_path,
            results: Mutex::new(results),
        })
    }

    /// Most recent results, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<WeighResult>> {
        let mut all = self.find_all()?;
        all.truncate(limit);
        Ok(all)
    }
}

impl WeighResultRepository for FileWeighResultRepository {
    fn save(&self, result: &WeighResult) -> std::result::Result<(), Error> {
        if !result.verify() {
            return Err(StoreError::Corrupted(format!("weigh result {} is not sealed", result.id)).into());
        }
        let mut results = json_file::lock(&self.results, "weigh results")?;
        if results.contains_key(&result.id) {
            return Err(StoreError::AlreadyExists(result.id.clone()).into());
        }
        json_file::commit(&self.store_path, &mut *results, |next| {
            next.insert(result.id.clone(), result.clone());
        })?;
        info!(id = %result.id, compliant = result.verdict.overall_compliant, "weigh result saved");
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> std::result::Result<Option<WeighResult>, Error> {
        Ok(json_file::lock(&self.results, "weigh results")?.get(id).cloned())
    }

    fn find_all(&self) -> std::result::Result<Vec<WeighResult>, Error> {
        let results = json_file::lock(&self.results, "weigh results")?;
        let mut all: Vec<_> = results.values().cloned().collect();
        all.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(all)
    }
}

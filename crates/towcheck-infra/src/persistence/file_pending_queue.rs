//! File-based admin review queue

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use towcheck_domain::model::StoredSpec;
use towcheck_domain::repository::{ensure_pending, PendingReviewQueue};
use towcheck_types::{ComplianceError, Error, Result};

use super::json_file;

/// Pending submissions stored as `pending.json`, keyed by record id
pub struct FilePendingQueue {
    store_path: PathBuf,
    pending: Mutex<BTreeMap<String, StoredSpec>>,
}

impl FilePendingQueue {
    /// Create or load the queue in `store_dir`
    pub fn open(store_dir: &Path) -> Result<Self> {
        fs::create_dir_all(store_dir)?;
        let store_path = store_dir.join("pending.json");
        let pending: BTreeMap<String, StoredSpec> = json_file::load(&store_path)?;
        debug!(path = %store_path.display(), records = pending.len(), "opened review queue");
        Ok(Self {
            store_path,
            pending: Mutex::new(pending),
        })
    }
}

impl PendingReviewQueue for FilePendingQueue {
    fn register(&self, record: StoredSpec) -> std::result::Result<(), Error> {
        ensure_pending(&record)?;
        // Check and insert under one lock so two submissions of the same
        // identity cannot both land
        let mut pending = json_file::lock(&self.pending, "pending")?;
        let identity = record.identity();
        if let Some(existing) = pending
            .values()
            .find(|s| s.identity() == identity && s.id() != record.id())
        {
            return Err(ComplianceError::DuplicatePendingSubmission {
                identity,
                existing_id: existing.id().to_string(),
            }
            .into());
        }
        json_file::commit(&self.store_path, &mut *pending, |next| {
            next.insert(record.id().to_string(), record);
        })
    }

    fn find_by_id(&self, id: &str) -> std::result::Result<Option<StoredSpec>, Error> {
        Ok(json_file::lock(&self.pending, "pending")?.get(id).cloned())
    }

    fn withdraw(&self, id: &str) -> std::result::Result<Option<StoredSpec>, Error> {
        let mut pending = json_file::lock(&self.pending, "pending")?;
        if !pending.contains_key(id) {
            return Ok(None);
        }
        json_file::commit(&self.store_path, &mut *pending, |next| next.remove(id))
    }

    fn find_all(&self) -> std::result::Result<Vec<StoredSpec>, Error> {
        let pending = json_file::lock(&self.pending, "pending")?;
        Ok(pending.values().cloned().collect())
    }
}

//! Repository trait definitions for the shared registry and weigh results

use crate::model::{Provenance, SpecKey, SpecKind, StoredSpec, WeighResult};
use towcheck_types::{ComplianceError, Error};

/// Verified registry of vehicle and caravan specifications.
///
/// Implementations are shared between requests and must tolerate concurrent
/// reads of the same key.
pub trait SpecRegistry: Send + Sync {
    /// Find by make/model/year/variant
    fn lookup_spec(&self, kind: SpecKind, key: &SpecKey) -> Result<Option<StoredSpec>, Error>;

    /// Find by registration plate and state
    fn lookup_spec_by_plate(
        &self,
        kind: SpecKind,
        plate: &str,
        state: &str,
    ) -> Result<Option<StoredSpec>, Error>;

    /// Insert or replace the record with the same identity.
    /// Only MASTER_VERIFIED and ADMIN_VERIFIED records are accepted.
    fn upsert_verified_spec(&self, record: StoredSpec) -> Result<(), Error>;

    /// Find all registry records
    fn find_all(&self) -> Result<Vec<StoredSpec>, Error>;
}

/// Queue of user-declared specifications awaiting administrator review
pub trait PendingReviewQueue: Send + Sync {
    /// Register a pending record. Fails with `DuplicatePendingSubmission`
    /// when another record with the same identity is already pending.
    fn register(&self, record: StoredSpec) -> Result<(), Error>;

    /// Find a pending record by id
    fn find_by_id(&self, id: &str) -> Result<Option<StoredSpec>, Error>;

    /// Remove a record from the queue, returning it if it was present
    fn withdraw(&self, id: &str) -> Result<Option<StoredSpec>, Error>;

    /// Find all pending records
    fn find_all(&self) -> Result<Vec<StoredSpec>, Error>;
}

/// Insert-only store of sealed weigh results
pub trait WeighResultRepository {
    /// Save a new result; existing ids are never overwritten
    fn save(&self, result: &WeighResult) -> Result<(), Error>;

    /// Find a result by id
    fn find_by_id(&self, id: &str) -> Result<Option<WeighResult>, Error>;

    /// Find all results, newest first
    fn find_all(&self) -> Result<Vec<WeighResult>, Error>;
}

/// Guard for registry writes
pub fn ensure_verified(record: &StoredSpec) -> Result<(), ComplianceError> {
    match record.provenance() {
        Provenance::MasterVerified | Provenance::AdminVerified => Ok(()),
        other => Err(ComplianceError::UnverifiedRegistryWrite(other.to_string())),
    }
}

/// Guard for queue writes
pub fn ensure_pending(record: &StoredSpec) -> Result<(), ComplianceError> {
    match record.provenance() {
        Provenance::UserProvidedPendingReview => Ok(()),
        other => Err(ComplianceError::InvalidTransition {
            from: other.to_string(),
            to: Provenance::UserProvidedPendingReview.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory doubles for service tests

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryRegistry {
        specs: Mutex<HashMap<String, StoredSpec>>,
    }

    impl MemoryRegistry {
        pub fn with(records: Vec<StoredSpec>) -> Self {
            let specs = records.into_iter().map(|r| (r.identity(), r)).collect();
            Self {
                specs: Mutex::new(specs),
            }
        }
    }

    impl SpecRegistry for MemoryRegistry {
        fn lookup_spec(&self, kind: SpecKind, key: &SpecKey) -> Result<Option<StoredSpec>, Error> {
            let specs = self.specs.lock().unwrap();
            Ok(specs
                .values()
                .find(|s| s.kind() == kind && s.key().matches_descriptor(key))
                .cloned())
        }

        fn lookup_spec_by_plate(
            &self,
            kind: SpecKind,
            plate: &str,
            state: &str,
        ) -> Result<Option<StoredSpec>, Error> {
            let specs = self.specs.lock().unwrap();
            Ok(specs
                .values()
                .find(|s| s.kind() == kind && s.key().matches_plate(plate, state))
                .cloned())
        }

        fn upsert_verified_spec(&self, record: StoredSpec) -> Result<(), Error> {
            ensure_verified(&record)?;
            self.specs.lock().unwrap().insert(record.identity(), record);
            Ok(())
        }

        fn find_all(&self) -> Result<Vec<StoredSpec>, Error> {
            Ok(self.specs.lock().unwrap().values().cloned().collect())
        }
    }

    #[derive(Default)]
    pub struct MemoryQueue {
        pending: Mutex<HashMap<String, StoredSpec>>,
    }

    impl PendingReviewQueue for MemoryQueue {
        fn register(&self, record: StoredSpec) -> Result<(), Error> {
            ensure_pending(&record)?;
            let mut pending = self.pending.lock().unwrap();
            let identity = record.identity();
            if let Some(existing) = pending.values().find(|s| s.identity() == identity) {
                if existing.id() != record.id() {
                    return Err(ComplianceError::DuplicatePendingSubmission {
                        identity,
                        existing_id: existing.id().to_string(),
                    }
                    .into());
                }
            }
            pending.insert(record.id().to_string(), record);
            Ok(())
        }

        fn find_by_id(&self, id: &str) -> Result<Option<StoredSpec>, Error> {
            Ok(self.pending.lock().unwrap().get(id).cloned())
        }

        fn withdraw(&self, id: &str) -> Result<Option<StoredSpec>, Error> {
            Ok(self.pending.lock().unwrap().remove(id))
        }

        fn find_all(&self) -> Result<Vec<StoredSpec>, Error> {
            Ok(self.pending.lock().unwrap().values().cloned().collect())
        }
    }
}

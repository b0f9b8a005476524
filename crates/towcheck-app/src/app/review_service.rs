//! Registry maintenance and admin review use cases

use std::path::Path;

use tracing::info;
use towcheck_domain::model::StoredSpec;
use towcheck_domain::repository::{PendingReviewQueue, SpecRegistry};
use towcheck_domain::service::{AdminReview, ProvenanceGate};
use towcheck_infra::persistence::FileSpecRegistry;
use towcheck_infra::registry_loader::RegistrySeed;
use towcheck_types::Result;

/// Import a TOML seed file into the registry as MASTER_VERIFIED records
pub fn import_registry_seed(registry: &FileSpecRegistry, seed_path: &Path) -> Result<usize> {
    let seed = RegistrySeed::load_from_file(seed_path)?;
    let count = registry.upsert_all(seed.into_records())?;
    info!(count, seed = %seed_path.display(), "registry seed imported");
    Ok(count)
}

/// Pending submissions, oldest declaration first
pub fn list_pending<Q: PendingReviewQueue + ?Sized>(queue: &Q) -> Result<Vec<StoredSpec>> {
    let mut pending = queue.find_all()?;
    pending.sort_by_key(declared_at);
    Ok(pending)
}

/// Approve a pending submission and merge it into the registry
pub fn approve_submission<R, Q>(
    registry: &R,
    queue: &Q,
    id: &str,
    reviewer: &str,
) -> Result<StoredSpec>
where
    R: SpecRegistry + ?Sized,
    Q: PendingReviewQueue + ?Sized,
{
    ProvenanceGate::new(registry, queue).approve_pending(id, &AdminReview::now(reviewer))
}

fn declared_at(spec: &StoredSpec) -> Option<chrono::DateTime<chrono::Utc>> {
    match spec {
        StoredSpec::Vehicle(r) => r.declared_at(),
        StoredSpec::Caravan(r) => r.declared_at(),
    }
}

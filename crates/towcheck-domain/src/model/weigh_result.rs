//! Sealed weigh result as handed to persistence and reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::compliance::ComplianceVerdict;
use super::spec_record::{CapacitySet, Provenance, SpecKey, SpecKind, SpecRecord};
use super::weighing::{CanonicalWeights, WeighingMethod};

/// The parts of a spec record a persisted result must carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecSnapshot {
    pub id: String,
    pub kind: SpecKind,
    pub key: SpecKey,
    pub provenance: Provenance,
    pub requires_admin_verification: bool,
}

impl<C: CapacitySet> From<&SpecRecord<C>> for SpecSnapshot {
    fn from(record: &SpecRecord<C>) -> Self {
        Self {
            id: record.id().to_string(),
            kind: record.kind(),
            key: record.key().clone(),
            provenance: record.provenance(),
            requires_admin_verification: record.requires_admin_verification(),
        }
    }
}

/// Completed weigh session. Immutable once sealed; a modification is a new
/// result that names the one it supersedes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeighResult {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub method: WeighingMethod,
    pub weights: CanonicalWeights,
    pub verdict: ComplianceVerdict,
    pub vehicle_spec: SpecSnapshot,
    #[serde(default)]
    pub caravan_spec: Option<SpecSnapshot>,
    #[serde(default)]
    pub supersedes: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// SHA-256 over every other field
    pub digest: String,
}

impl WeighResult {
    #[allow(clippy::too_many_arguments)]
    pub fn seal(
        method: WeighingMethod,
        weights: CanonicalWeights,
        verdict: ComplianceVerdict,
        vehicle_spec: SpecSnapshot,
        caravan_spec: Option<SpecSnapshot>,
        supersedes: Option<String>,
        notes: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let mut result = Self {
            id: uuid::Uuid::new_v4().to_string(),
            recorded_at,
            method,
            weights,
            verdict,
            vehicle_spec,
            caravan_spec,
            supersedes,
            notes,
            digest: String::new(),
        };
        result.digest = result.compute_digest()?;
        Ok(result)
    }

    fn compute_digest(&self) -> Result<String, serde_json::Error> {
        let mut unsealed = self.clone();
        unsealed.digest.clear();
        let bytes = serde_json::to_vec(&unsealed)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }

    /// Whether the content still matches the digest taken at sealing
    pub fn verify(&self) -> bool {
        self.compute_digest()
            .map(|digest| digest == self.digest)
            .unwrap_or(false)
    }

    /// True when a spec behind this result is still awaiting review
    pub fn is_provisional(&self) -> bool {
        self.verdict.is_provisional()
            || self.vehicle_spec.provenance.is_provisional()
            || self
                .caravan_spec
                .as_ref()
                .map(|s| s.provenance.is_provisional())
                .unwrap_or(false)
    }
}

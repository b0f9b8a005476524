//! Trust lifecycle of specification records
//!
//! ```text
//! USER_PROVIDED_PENDING_REVIEW --admin approval--> ADMIN_VERIFIED --merge--> registry
//! USER_PROVIDED_PENDING_REVIEW --resubmission--> USER_PROVIDED_PENDING_REVIEW (new record)
//! MASTER_VERIFIED: terminal
//! ```

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use towcheck_types::{ComplianceError, Error};

use crate::model::{CapacitySet, Provenance, SpecRecord, StoredSpec};
use crate::repository::{ensure_pending, ensure_verified, PendingReviewQueue, SpecRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvenanceEvent {
    /// An administrator accepted the record
    AdminApproved,
    /// The user corrected and resubmitted the record
    Resubmitted,
}

/// Next provenance for an event, or `InvalidTransition`
pub fn next_provenance(
    from: Provenance,
    event: ProvenanceEvent,
) -> Result<Provenance, ComplianceError> {
    match (from, event) {
        (Provenance::UserProvidedPendingReview, ProvenanceEvent::AdminApproved) => {
            Ok(Provenance::AdminVerified)
        }
        (Provenance::UserProvidedPendingReview, ProvenanceEvent::Resubmitted) => {
            Ok(Provenance::UserProvidedPendingReview)
        }
        (from, event) => Err(ComplianceError::InvalidTransition {
            from: from.to_string(),
            to: match event {
                ProvenanceEvent::AdminApproved => Provenance::AdminVerified.to_string(),
                ProvenanceEvent::Resubmitted => Provenance::UserProvidedPendingReview.to_string(),
            },
        }),
    }
}

/// Administrator decision recorded on approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminReview {
    pub reviewer: String,
    pub reviewed_at: DateTime<Utc>,
}

impl AdminReview {
    pub fn now(reviewer: impl Into<String>) -> Self {
        Self {
            reviewer: reviewer.into(),
            reviewed_at: Utc::now(),
        }
    }
}

/// Result of submitting a record for review
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<C> {
    /// The record was queued
    Created(SpecRecord<C>),
    /// An identical declaration was already queued; use it instead
    AlreadyPending(SpecRecord<C>),
    /// The queued record for this identity had other ratings and was replaced
    Resubmitted(SpecRecord<C>),
}

/// Gates writes to the review queue and the verified registry
pub struct ProvenanceGate<'a, R: SpecRegistry + ?Sized, Q: PendingReviewQueue + ?Sized> {
    registry: &'a R,
    queue: &'a Q,
}

impl<'a, R, Q> ProvenanceGate<'a, R, Q>
where
    R: SpecRegistry + ?Sized,
    Q: PendingReviewQueue + ?Sized,
{
    pub fn new(registry: &'a R, queue: &'a Q) -> Self {
        Self { registry, queue }
    }

    /// Queue a pending record for administrator review
    pub fn submit<C: CapacitySet>(&self, record: &SpecRecord<C>) -> Result<(), Error> {
        let stored = record.clone().into_stored();
        ensure_pending(&stored)?;
        self.queue.register(stored)?;
        info!(id = record.id(), identity = %record.identity(), "queued for admin review");
        Ok(())
    }

    /// Queue a record, or hand back the record already pending for the same identity
    pub fn submit_or_existing<C: CapacitySet>(
        &self,
        record: SpecRecord<C>,
    ) -> Result<Submission<C>, Error> {
        match self.submit(&record) {
            Ok(()) => Ok(Submission::Created(record)),
            Err(Error::Compliance(ComplianceError::DuplicatePendingSubmission {
                identity,
                existing_id,
            })) => {
                warn!(%identity, %existing_id, "already pending review; reusing existing record");
                let existing = self
                    .queue
                    .find_by_id(&existing_id)?
                    .and_then(C::unwrap)
                    .ok_or_else(|| ComplianceError::DuplicatePendingSubmission {
                        identity: identity.clone(),
                        existing_id: existing_id.clone(),
                    })?;
                Ok(Submission::AlreadyPending(existing))
            }
            Err(e) => Err(e),
        }
    }

    /// Queue an accepted declaration.
    ///
    /// A pending record with the same identity is reused when it declares the
    /// same ratings, and replaced by this one when it does not.
    pub fn submit_declared<C: CapacitySet>(
        &self,
        record: SpecRecord<C>,
    ) -> Result<Submission<C>, Error> {
        match self.submit_or_existing(record.clone())? {
            Submission::AlreadyPending(existing) if !existing.same_declaration(&record) => {
                self.resubmit(&existing, record).map(Submission::Resubmitted)
            }
            submission => Ok(submission),
        }
    }

    /// Replace a pending record with a corrected one.
    ///
    /// The previous record is withdrawn from the queue and the correction is
    /// queued in its place, naming the record it supersedes.
    pub fn resubmit<C: CapacitySet>(
        &self,
        previous: &SpecRecord<C>,
        corrected: SpecRecord<C>,
    ) -> Result<SpecRecord<C>, Error> {
        next_provenance(previous.provenance(), ProvenanceEvent::Resubmitted)?;
        ensure_pending(&corrected.clone().into_stored())?;
        let record = corrected.superseding(previous.id());
        self.queue.withdraw(previous.id())?;
        self.submit(&record)?;
        info!(id = record.id(), supersedes = previous.id(), "pending record corrected");
        Ok(record)
    }

    /// Apply an administrator approval, producing the verified record
    pub fn approve<C: CapacitySet>(
        &self,
        record: &SpecRecord<C>,
        review: &AdminReview,
    ) -> Result<SpecRecord<C>, ComplianceError> {
        next_provenance(record.provenance(), ProvenanceEvent::AdminApproved)?;
        Ok(record.reviewed(&review.reviewer, review.reviewed_at))
    }

    /// Merge a verified record into the registry and clear it from the queue
    pub fn promote<C: CapacitySet>(&self, record: &SpecRecord<C>) -> Result<(), Error> {
        let stored = record.clone().into_stored();
        ensure_verified(&stored)?;
        self.registry.upsert_verified_spec(stored)?;
        self.queue.withdraw(record.id())?;
        info!(id = record.id(), identity = %record.identity(), "merged into registry");
        Ok(())
    }

    /// Approve a queued record by id and merge it into the registry
    pub fn approve_pending(&self, id: &str, review: &AdminReview) -> Result<StoredSpec, Error> {
        let stored = self
            .queue
            .find_by_id(id)?
            .ok_or_else(|| towcheck_types::StoreError::NotFound(id.to_string()))?;
        let verified = match stored {
            StoredSpec::Vehicle(record) => {
                let verified = self.approve(&record, review)?;
                self.promote(&verified)?;
                verified.into_stored()
            }
            StoredSpec::Caravan(record) => {
                let verified = self.approve(&record, review)?;
                self.promote(&verified)?;
                verified.into_stored()
            }
        };
        Ok(verified)
    }
}

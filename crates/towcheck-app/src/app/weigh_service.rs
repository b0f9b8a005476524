//! Weigh Service - core use case for a tow-combination compliance check
//!
//! This service orchestrates one check:
//! 1. Derive canonical weights from the raw readings
//! 2. Resolve the vehicle (and caravan) specification from the registry
//! 3. Fall back to a user-declared specification
//! 4. Queue declarations for admin review once every specification is valid
//! 5. Evaluate every applicable check
//! 6. Seal the result for persistence

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use towcheck_domain::model::{
    CapacitySet, CaravanCapacities, DeclaredSpec, SpecKey, SpecKind, SpecLookup, SpecRecord,
    SpecSnapshot, VehicleCapacities, WeighResult,
};
use towcheck_domain::repository::{PendingReviewQueue, SpecRegistry, WeighResultRepository};
use towcheck_domain::service::{
    accept_user_declared, evaluate, DeltaCalculator, DeltaInput, ProvenanceGate, SpecResolver,
    Submission,
};
use towcheck_types::{ComplianceError, Error};

/// Errors specific to the weigh service
#[derive(Debug, Error)]
pub enum WeighServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Rejected(#[from] ComplianceError),

    #[error("No usable {kind} specification: {detail}")]
    SpecUnavailable { kind: SpecKind, detail: String },

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<Error> for WeighServiceError {
    fn from(err: Error) -> Self {
        match err {
            Error::Compliance(e) => WeighServiceError::Rejected(e),
            Error::FileNotFound(_) | Error::Json(_) | Error::Csv(_) | Error::Toml(_) => {
                WeighServiceError::InvalidRequest(err.to_string())
            }
            Error::Config(e) => WeighServiceError::ConfigError(e.to_string()),
            Error::Store(e) => WeighServiceError::StoreError(e.to_string()),
            Error::Io(e) => WeighServiceError::StoreError(e.to_string()),
            Error::CheckFailed(msg) => WeighServiceError::InvalidRequest(msg),
        }
    }
}

impl From<WeighServiceError> for Error {
    fn from(err: WeighServiceError) -> Self {
        match err {
            WeighServiceError::Rejected(e) => Error::Compliance(e),
            other => Error::CheckFailed(other.to_string()),
        }
    }
}

impl WeighServiceError {
    /// Domain error behind this failure, if any
    pub fn as_compliance(&self) -> Option<&ComplianceError> {
        match self {
            WeighServiceError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

/// Where to find one specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRequest<C> {
    /// Registry key to try first
    #[serde(default)]
    pub lookup: Option<SpecKey>,
    /// Manual entry used when the registry has no complete record
    #[serde(default)]
    pub declared: Option<DeclaredSpec<C>>,
}

impl<C> SpecRequest<C> {
    pub fn lookup(key: SpecKey) -> Self {
        Self {
            lookup: Some(key),
            declared: None,
        }
    }

    pub fn declared(declared: DeclaredSpec<C>) -> Self {
        Self {
            lookup: None,
            declared: Some(declared),
        }
    }

    pub fn with_declared(mut self, declared: DeclaredSpec<C>) -> Self {
        self.declared = Some(declared);
        self
    }
}

/// A complete weigh-check request, as read from a request file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeighRequest {
    pub readings: DeltaInput,
    pub vehicle: SpecRequest<VehicleCapacities>,
    #[serde(default)]
    pub caravan: Option<SpecRequest<CaravanCapacities>>,
    /// Id of an earlier result this check corrects
    #[serde(default)]
    pub supersedes: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WeighRequest {
    pub fn load_from_file(path: &Path) -> towcheck_types::Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// How a specification was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecSource {
    /// Complete record found in the registry
    Registry,
    /// User declaration accepted and queued for review
    Declared,
    /// An identical declaration was already queued; that record was used
    ReusedPending,
    /// The queued record for this identity had other ratings and was replaced
    Resubmitted,
}

/// Sealed result plus how each spec was resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeighOutcome {
    pub result: WeighResult,
    pub vehicle_source: SpecSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caravan_source: Option<SpecSource>,
}

/// A specification found in the registry or accepted from a declaration,
/// not yet queued for review
enum Located<C> {
    Registry(SpecRecord<C>),
    Declared(SpecRecord<C>),
}

/// Complete registry record first, then the validated user declaration.
/// Nothing is written to the review queue here.
fn locate_spec<C, R>(
    request: &SpecRequest<C>,
    registry: &R,
    now: DateTime<Utc>,
) -> std::result::Result<Located<C>, WeighServiceError>
where
    C: CapacitySet,
    R: SpecRegistry + ?Sized,
{
    let mut detail = "no registry key or declared specification given".to_string();

    if let Some(ref key) = request.lookup {
        match SpecResolver::new(registry).resolve::<C>(key)? {
            SpecLookup::Complete(record) => return Ok(Located::Registry(record)),
            SpecLookup::IncompleteFound { missing, .. } => {
                detail = format!("registry record for {} is missing {}", key, missing.join(", "));
            }
            SpecLookup::NotFound => {
                detail = format!("{} is not in the registry", key);
            }
        }
    }

    let Some(ref declared) = request.declared else {
        return Err(WeighServiceError::SpecUnavailable {
            kind: C::KIND,
            detail,
        });
    };
    Ok(Located::Declared(accept_user_declared(declared.clone(), now)?))
}

/// Queue a declared record for review; registry records pass through
fn queue_located<C, R, Q>(
    located: Located<C>,
    gate: &ProvenanceGate<'_, R, Q>,
) -> std::result::Result<(SpecRecord<C>, SpecSource), WeighServiceError>
where
    C: CapacitySet,
    R: SpecRegistry + ?Sized,
    Q: PendingReviewQueue + ?Sized,
{
    let record = match located {
        Located::Registry(record) => return Ok((record, SpecSource::Registry)),
        Located::Declared(record) => record,
    };
    Ok(match gate.submit_declared(record)? {
        Submission::Created(record) => (record, SpecSource::Declared),
        Submission::AlreadyPending(record) => (record, SpecSource::ReusedPending),
        Submission::Resubmitted(record) => (record, SpecSource::Resubmitted),
    })
}

/// Main entry point: run a complete weigh check
pub fn run_weigh_check<R, Q>(
    request: &WeighRequest,
    registry: &R,
    queue: &Q,
    calculator: &DeltaCalculator,
) -> std::result::Result<WeighOutcome, WeighServiceError>
where
    R: SpecRegistry + ?Sized,
    Q: PendingReviewQueue + ?Sized,
{
    let weights = calculator.derive(&request.readings)?;

    if request.caravan.is_some() && !request.readings.has_caravan() {
        return Err(ComplianceError::MissingRequiredInput(
            "caravan readings for the caravan specification".to_string(),
        )
        .into());
    }
    if request.caravan.is_none() && request.readings.has_caravan() {
        warn!("caravan readings given without a caravan specification; caravan checks skipped");
    }

    let now = Utc::now();
    let vehicle = locate_spec(&request.vehicle, registry, now)?;
    let caravan = request
        .caravan
        .as_ref()
        .map(|caravan_request| locate_spec(caravan_request, registry, now))
        .transpose()?;

    // Both specifications are valid; only now touch the review queue
    let gate = ProvenanceGate::new(registry, queue);
    let (vehicle, vehicle_source) = queue_located(vehicle, &gate)?;
    let caravan = match caravan.map(|located| queue_located(located, &gate)).transpose() {
        Ok(caravan) => caravan,
        Err(e) => {
            if vehicle_source == SpecSource::Declared {
                warn!(id = vehicle.id(), "caravan submission failed; withdrawing vehicle submission");
                queue.withdraw(vehicle.id())?;
            }
            return Err(e);
        }
    };
    let caravan_spec = caravan.as_ref().map(|(record, _)| record);

    let verdict = evaluate(Some(&weights), Some(&vehicle), caravan_spec)?;

    let result = WeighResult::seal(
        request.readings.method,
        weights,
        verdict,
        SpecSnapshot::from(&vehicle),
        caravan_spec.map(SpecSnapshot::from),
        request.supersedes.clone(),
        request.notes.clone(),
        now,
    )
    .map_err(|e| WeighServiceError::StoreError(format!("Failed to seal result: {}", e)))?;

    info!(
        id = %result.id,
        compliant = result.verdict.overall_compliant,
        provisional = result.is_provisional(),
        "weigh check complete"
    );

    Ok(WeighOutcome {
        result,
        vehicle_source,
        caravan_source: caravan.map(|(_, source)| source),
    })
}

/// Persist a sealed result. A correction must name a result that exists.
pub fn save_result<W: WeighResultRepository + ?Sized>(
    repo: &W,
    result: &WeighResult,
) -> std::result::Result<(), WeighServiceError> {
    if let Some(ref previous) = result.supersedes {
        if repo.find_by_id(previous)?.is_none() {
            return Err(WeighServiceError::InvalidRequest(format!(
                "superseded result {} does not exist",
                previous
            )));
        }
    }
    repo.save(result)?;
    Ok(())
}

//! Resolution of weight-limit specifications from the registry or user input

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, warn};
use towcheck_types::{ComplianceError, Error, Violations};

use crate::model::{CapacitySet, DeclaredKey, DeclaredSpec, PlateKey, SpecKey, SpecLookup, SpecRecord, StoredSpec};
use crate::repository::SpecRegistry;

/// Earliest model year accepted from user input
pub const MIN_MODEL_YEAR: u16 = 1900;

/// Looks up verified specifications
pub struct SpecResolver<'a, R: SpecRegistry + ?Sized> {
    registry: &'a R,
}

impl<'a, R: SpecRegistry + ?Sized> SpecResolver<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Look up a key: by plate first when the key carries one, then by
    /// make/model/year/variant.
    pub fn resolve<C: CapacitySet>(&self, key: &SpecKey) -> Result<SpecLookup<C>, Error> {
        let mut found = None;
        if let Some(ref plate) = key.plate {
            found = self
                .registry
                .lookup_spec_by_plate(C::KIND, &plate.plate, &plate.state)?;
        }
        if found.is_none() {
            found = self.registry.lookup_spec(C::KIND, key)?;
        }
        Ok(self.classify(found, &key.to_string()))
    }

    /// Look up by plate and state only
    pub fn resolve_by_plate<C: CapacitySet>(
        &self,
        plate: &str,
        state: &str,
    ) -> Result<SpecLookup<C>, Error> {
        let found = self.registry.lookup_spec_by_plate(C::KIND, plate, state)?;
        Ok(self.classify(found, &format!("{} {}", plate, state)))
    }

    fn classify<C: CapacitySet>(&self, found: Option<StoredSpec>, wanted: &str) -> SpecLookup<C> {
        let Some(stored) = found else {
            debug!(kind = %C::KIND, key = wanted, "registry miss");
            return SpecLookup::NotFound;
        };
        if stored.provenance().is_provisional() {
            warn!(id = stored.id(), "registry returned an unreviewed record; ignoring it");
            return SpecLookup::NotFound;
        }
        let Some(record) = C::unwrap(stored) else {
            warn!(kind = %C::KIND, key = wanted, "registry returned a record of another kind");
            return SpecLookup::NotFound;
        };

        let missing = record.capacities().missing_required();
        if missing.is_empty() {
            debug!(kind = %C::KIND, id = record.id(), "registry hit");
            SpecLookup::Complete(record)
        } else {
            info!(
                kind = %C::KIND,
                id = record.id(),
                missing = ?missing,
                "registry record incomplete; manual entry required"
            );
            SpecLookup::IncompleteFound { record, missing }
        }
    }
}

/// Validate a declaration against every rule and build a pending record.
///
/// All violations are collected before failing. The record is tagged
/// `USER_PROVIDED_PENDING_REVIEW`, flagged for admin verification and
/// stamped with `declared_at`.
pub fn accept_user_declared<C: CapacitySet>(
    declared: DeclaredSpec<C>,
    declared_at: DateTime<Utc>,
) -> Result<SpecRecord<C>, ComplianceError> {
    let mut violations = Violations::new();
    let key = validate_key(&declared.key, declared_at.year(), &mut violations);
    violations.extend(declared.capacities.declared_violations());

    match key {
        Some(key) if violations.is_empty() => {
            let record = SpecRecord::user_declared(key, declared.capacities, declared_at);
            info!(
                kind = %C::KIND,
                id = record.id(),
                identity = %record.identity(),
                "accepted user-declared specification pending review"
            );
            Ok(record)
        }
        _ => Err(ComplianceError::InvalidSpec(violations)),
    }
}

fn validate_key(key: &DeclaredKey, current_year: i32, violations: &mut Violations) -> Option<SpecKey> {
    let make = key.make.trim();
    let model = key.model.trim();
    if make.is_empty() {
        violations.push("make", "is required");
    }
    if model.is_empty() {
        violations.push("model", "is required");
    }

    let max_year = current_year + 1;
    let year = match key.year {
        None => {
            violations.push("year", "is required");
            None
        }
        Some(y) if !y.is_finite() || y.fract() != 0.0 => {
            violations.push("year", format!("must be a whole number (got {})", y));
            None
        }
        Some(y) if y < f64::from(MIN_MODEL_YEAR) || y > f64::from(max_year) => {
            violations.push(
                "year",
                format!("must be between {} and {} (got {})", MIN_MODEL_YEAR, max_year, y),
            );
            None
        }
        Some(y) => Some(y as u16),
    };

    let plate = match (non_blank(&key.plate), non_blank(&key.state)) {
        (Some(plate), Some(state)) => Some(PlateKey::new(plate, state)),
        (Some(_), None) => {
            violations.push("state", "is required when a plate is given");
            None
        }
        (None, Some(_)) => {
            violations.push("plate", "is required when a state is given");
            None
        }
        (None, None) => None,
    };

    let year = year?;
    if make.is_empty() || model.is_empty() {
        return None;
    }
    Some(SpecKey {
        make: make.to_string(),
        model: model.to_string(),
        year,
        variant: non_blank(&key.variant).map(str::to_string),
        plate,
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

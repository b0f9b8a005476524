//! Vehicle and caravan weight-limit specifications and their provenance

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use towcheck_types::Violations;

/// Trust classification of a specification record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Loaded from the verified registry
    MasterVerified,
    /// Entered by a user, usable for the current session only
    UserProvidedPendingReview,
    /// Reviewed by an administrator, eligible for registry merge
    AdminVerified,
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::MasterVerified => "MASTER_VERIFIED",
            Provenance::UserProvidedPendingReview => "USER_PROVIDED_PENDING_REVIEW",
            Provenance::AdminVerified => "ADMIN_VERIFIED",
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, Provenance::UserProvidedPendingReview)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecKind {
    Vehicle,
    Caravan,
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecKind::Vehicle => write!(f, "vehicle"),
            SpecKind::Caravan => write!(f, "caravan"),
        }
    }
}

/// Registration plate and issuing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateKey {
    pub plate: String,
    pub state: String,
}

impl PlateKey {
    pub fn new(plate: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            state: state.into(),
        }
    }

    pub fn identity(&self) -> String {
        format!(
            "plate:{}|{}",
            normalize_plate(&self.plate),
            self.state.trim().to_uppercase()
        )
    }

    pub fn matches(&self, plate: &str, state: &str) -> bool {
        normalize_plate(&self.plate) == normalize_plate(plate)
            && self.state.trim().eq_ignore_ascii_case(state.trim())
    }
}

/// Identifying key of a vehicle or caravan model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecKey {
    pub make: String,
    pub model: String,
    pub year: u16,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub plate: Option<PlateKey>,
}

impl SpecKey {
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: u16) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
            variant: None,
            plate: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_plate(mut self, plate: impl Into<String>, state: impl Into<String>) -> Self {
        self.plate = Some(PlateKey::new(plate, state));
        self
    }

    /// Make/model/year/variant part of the key, normalised
    pub fn descriptor_identity(&self) -> String {
        format!(
            "model:{}|{}|{}|{}",
            normalize_text(&self.make),
            normalize_text(&self.model),
            self.year,
            self.variant.as_deref().map(normalize_text).unwrap_or_default()
        )
    }

    /// Uniqueness key: plate+state when known, otherwise make/model/year/variant
    pub fn identity(&self) -> String {
        match &self.plate {
            Some(plate) => plate.identity(),
            None => self.descriptor_identity(),
        }
    }

    pub fn matches_descriptor(&self, other: &SpecKey) -> bool {
        self.descriptor_identity() == other.descriptor_identity()
    }

    pub fn matches_plate(&self, plate: &str, state: &str) -> bool {
        self.plate
            .as_ref()
            .map(|p| p.matches(plate, state))
            .unwrap_or(false)
    }
}

impl fmt::Display for SpecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.year, self.make, self.model)?;
        if let Some(ref variant) = self.variant {
            write!(f, " {}", variant)?;
        }
        if let Some(ref plate) = self.plate {
            write!(f, " [{} {}]", plate.plate, plate.state)?;
        }
        Ok(())
    }
}

/// Strip separators and case so "ABC-123" and "abc 123" compare equal
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Capacity fields of one kind of specification
pub trait CapacitySet: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned {
    const KIND: SpecKind;

    /// Required fields that are absent
    fn missing_required(&self) -> Vec<&'static str>;

    /// Presence, positivity and cross-field rules for a user declaration
    fn declared_violations(&self) -> Violations;

    fn wrap(record: SpecRecord<Self>) -> StoredSpec;

    fn unwrap(stored: StoredSpec) -> Option<SpecRecord<Self>>;
}

/// Tow vehicle ratings in kg
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleCapacities {
    #[serde(default)]
    pub gvm: Option<f64>,
    #[serde(default)]
    pub gcm: Option<f64>,
    #[serde(default)]
    pub btc: Option<f64>,
    #[serde(default)]
    pub tbm: Option<f64>,
    #[serde(default)]
    pub fawr: Option<f64>,
    #[serde(default)]
    pub rawr: Option<f64>,
}

impl VehicleCapacities {
    fn required(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("gvm", self.gvm),
            ("gcm", self.gcm),
            ("btc", self.btc),
            ("fawr", self.fawr),
            ("rawr", self.rawr),
        ]
    }
}

impl CapacitySet for VehicleCapacities {
    const KIND: SpecKind = SpecKind::Vehicle;

    fn missing_required(&self) -> Vec<&'static str> {
        missing(&self.required())
    }

    fn declared_violations(&self) -> Violations {
        let mut violations = Violations::new();
        check_positive(&self.required(), true, &mut violations);
        check_positive(&[("tbm", self.tbm)], false, &mut violations);

        if let (Some(gvm), Some(gcm)) = (self.gvm, self.gcm) {
            if gvm > 0.0 && gcm > 0.0 && gcm < gvm {
                violations.push(
                    "gcm",
                    format!("must be at least gvm ({} < {})", gcm, gvm),
                );
            }
        }
        violations
    }

    fn wrap(record: SpecRecord<Self>) -> StoredSpec {
        StoredSpec::Vehicle(record)
    }

    fn unwrap(stored: StoredSpec) -> Option<SpecRecord<Self>> {
        match stored {
            StoredSpec::Vehicle(record) => Some(record),
            StoredSpec::Caravan(_) => None,
        }
    }
}

/// Caravan or trailer ratings in kg
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaravanCapacities {
    #[serde(default)]
    pub atm: Option<f64>,
    #[serde(default)]
    pub gtm: Option<f64>,
    #[serde(default)]
    pub axle_capacity: Option<f64>,
    #[serde(default)]
    pub number_of_axles: Option<u32>,
}

impl CaravanCapacities {
    fn required(&self) -> [(&'static str, Option<f64>); 2] {
        [("atm", self.atm), ("gtm", self.gtm)]
    }
}

impl CapacitySet for CaravanCapacities {
    const KIND: SpecKind = SpecKind::Caravan;

    fn missing_required(&self) -> Vec<&'static str> {
        missing(&self.required())
    }

    fn declared_violations(&self) -> Violations {
        let mut violations = Violations::new();
        check_positive(&self.required(), true, &mut violations);
        check_positive(&[("axle_capacity", self.axle_capacity)], false, &mut violations);
        if self.number_of_axles == Some(0) {
            violations.push("number_of_axles", "must be at least 1");
        }

        // ATM includes the tow-ball share on top of GTM
        if let (Some(atm), Some(gtm)) = (self.atm, self.gtm) {
            if atm > 0.0 && gtm > 0.0 && atm < gtm {
                violations.push("atm", format!("must be at least gtm ({} < {})", atm, gtm));
            }
        }
        violations
    }

    fn wrap(record: SpecRecord<Self>) -> StoredSpec {
        StoredSpec::Caravan(record)
    }

    fn unwrap(stored: StoredSpec) -> Option<SpecRecord<Self>> {
        match stored {
            StoredSpec::Caravan(record) => Some(record),
            StoredSpec::Vehicle(_) => None,
        }
    }
}

fn missing(fields: &[(&'static str, Option<f64>)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect()
}

fn check_positive(
    fields: &[(&'static str, Option<f64>)],
    required: bool,
    violations: &mut Violations,
) {
    for (name, value) in fields {
        match value {
            None if required => violations.push(*name, "is required"),
            None => {}
            Some(v) if !v.is_finite() || *v <= 0.0 => {
                violations.push(*name, format!("must be greater than 0 (got {})", v))
            }
            Some(_) => {}
        }
    }
}

/// A weight-limit specification with its provenance.
///
/// Records are value objects: provenance changes produce a new record through
/// the resolver or the provenance gate, never an in-place edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRecord<C> {
    id: String,
    key: SpecKey,
    capacities: C,
    provenance: Provenance,
    requires_admin_verification: bool,
    #[serde(default)]
    declared_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reviewed_by: Option<String>,
    #[serde(default)]
    reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    supersedes: Option<String>,
}

pub type VehicleSpec = SpecRecord<VehicleCapacities>;
pub type CaravanSpec = SpecRecord<CaravanCapacities>;

impl<C: CapacitySet> SpecRecord<C> {
    /// Registry entry from the verified master data set
    pub fn master(key: SpecKey, capacities: C) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key,
            capacities,
            provenance: Provenance::MasterVerified,
            requires_admin_verification: false,
            declared_at: None,
            reviewed_by: None,
            reviewed_at: None,
            supersedes: None,
        }
    }

    pub(crate) fn user_declared(
        key: SpecKey,
        capacities: C,
        declared_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key,
            capacities,
            provenance: Provenance::UserProvidedPendingReview,
            requires_admin_verification: true,
            declared_at: Some(declared_at),
            reviewed_by: None,
            reviewed_at: None,
            supersedes: None,
        }
    }

    /// Same record after an administrator accepted it
    pub(crate) fn reviewed(&self, reviewer: &str, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            provenance: Provenance::AdminVerified,
            requires_admin_verification: false,
            reviewed_by: Some(reviewer.to_string()),
            reviewed_at: Some(reviewed_at),
            ..self.clone()
        }
    }

    pub fn kind(&self) -> SpecKind {
        C::KIND
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &SpecKey {
        &self.key
    }

    pub fn capacities(&self) -> &C {
        &self.capacities
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn requires_admin_verification(&self) -> bool {
        self.requires_admin_verification
    }

    pub fn declared_at(&self) -> Option<DateTime<Utc>> {
        self.declared_at
    }

    pub fn reviewed_by(&self) -> Option<&str> {
        self.reviewed_by.as_deref()
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn supersedes(&self) -> Option<&str> {
        self.supersedes.as_deref()
    }

    /// Same identity, descriptor and ratings; ids and timestamps are ignored
    pub fn same_declaration(&self, other: &Self) -> bool {
        self.identity() == other.identity()
            && self.key.descriptor_identity() == other.key.descriptor_identity()
            && self.capacities == other.capacities
    }

    /// This record queued as the correction of `previous_id`
    pub(crate) fn superseding(self, previous_id: &str) -> Self {
        Self {
            supersedes: Some(previous_id.to_string()),
            ..self
        }
    }

    /// Kind-qualified uniqueness key used by the registry and review queue
    pub fn identity(&self) -> String {
        format!("{}/{}", C::KIND, self.key.identity())
    }

    pub fn into_stored(self) -> StoredSpec {
        C::wrap(self)
    }
}

/// Type-erased record as kept by registries and the review queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoredSpec {
    Vehicle(VehicleSpec),
    Caravan(CaravanSpec),
}

impl StoredSpec {
    pub fn kind(&self) -> SpecKind {
        match self {
            StoredSpec::Vehicle(_) => SpecKind::Vehicle,
            StoredSpec::Caravan(_) => SpecKind::Caravan,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            StoredSpec::Vehicle(r) => r.id(),
            StoredSpec::Caravan(r) => r.id(),
        }
    }

    pub fn key(&self) -> &SpecKey {
        match self {
            StoredSpec::Vehicle(r) => r.key(),
            StoredSpec::Caravan(r) => r.key(),
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            StoredSpec::Vehicle(r) => r.provenance(),
            StoredSpec::Caravan(r) => r.provenance(),
        }
    }

    pub fn identity(&self) -> String {
        match self {
            StoredSpec::Vehicle(r) => r.identity(),
            StoredSpec::Caravan(r) => r.identity(),
        }
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        match self {
            StoredSpec::Vehicle(r) => r.capacities().missing_required(),
            StoredSpec::Caravan(r) => r.capacities().missing_required(),
        }
    }
}

/// Key fields as typed by a user, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredKey {
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    /// Kept as a number so fractional input can be rejected rather than truncated
    #[serde(default)]
    pub year: Option<f64>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// A user-declared specification awaiting acceptance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredSpec<C> {
    pub key: DeclaredKey,
    pub capacities: C,
}

impl<C> DeclaredSpec<C> {
    pub fn new(key: DeclaredKey, capacities: C) -> Self {
        Self { key, capacities }
    }
}

/// Outcome of a registry lookup
#[derive(Debug, Clone, PartialEq)]
pub enum SpecLookup<C> {
    /// Found with every required field present
    Complete(SpecRecord<C>),
    /// Found but unusable; the caller falls through to manual entry
    IncompleteFound {
        record: SpecRecord<C>,
        missing: Vec<&'static str>,
    },
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plate_identity_ignores_separators() {
        let a = SpecKey::new("Toyota", "LandCruiser", 2022).with_plate("abc-123", "nsw");
        let b = SpecKey::new("Ford", "Ranger", 2020).with_plate("ABC 123", "NSW");
        assert_eq!(a.identity(), b.identity());
        assert!(a.matches_plate("ABC123", "nsw"));
    }

    #[test]
    fn test_descriptor_identity_normalises_case_and_spacing() {
        let a = SpecKey::new("Toyota", "Land  Cruiser", 2022).with_variant("GXL");
        let b = SpecKey::new(" toyota", "land cruiser", 2022).with_variant("gxl");
        assert!(a.matches_descriptor(&b));
        let c = SpecKey::new("Toyota", "Land Cruiser", 2023).with_variant("GXL");
        assert!(!a.matches_descriptor(&c));
    }

    #[test]
    fn test_vehicle_missing_required_ignores_tbm() {
        let caps = VehicleCapacities {
            gvm: Some(3300.0),
            gcm: Some(7000.0),
            btc: Some(3500.0),
            tbm: None,
            fawr: Some(1500.0),
            rawr: None,
        };
        assert_eq!(caps.missing_required(), vec!["rawr"]);
    }

    #[test]
    fn test_caravan_atm_below_gtm_is_violation() {
        let caps = CaravanCapacities {
            atm: Some(2000.0),
            gtm: Some(2200.0),
            axle_capacity: None,
            number_of_axles: Some(0),
        };
        let violations = caps.declared_violations();
        assert!(violations.mentions("atm"));
        assert!(violations.mentions("number_of_axles"));
    }

    #[test]
    fn test_stored_spec_round_trip_keeps_kind() {
        let record = SpecRecord::master(
            SpecKey::new("Jayco", "Starcraft", 2021),
            CaravanCapacities {
                atm: Some(2500.0),
                gtm: Some(2300.0),
                ..Default::default()
            },
        );
        let json = serde_json::to_string(&record.clone().into_stored()).unwrap();
        assert!(json.contains("\"kind\":\"caravan\""));
        let back: StoredSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(CaravanCapacities::unwrap(back), Some(record));
    }

    #[test]
    fn test_provenance_serialises_screaming_case() {
        let json = serde_json::to_string(&Provenance::UserProvidedPendingReview).unwrap();
        assert_eq!(json, "\"USER_PROVIDED_PENDING_REVIEW\"");
        assert!(!Provenance::AdminVerified.is_provisional());
        assert!(Provenance::UserProvidedPendingReview.is_provisional());
    }
}

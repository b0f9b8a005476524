//! Registry seed loader from TOML master data
//!
//! ```toml
//! [[vehicles]]
//! make = "Toyota"
//! model = "LandCruiser 300"
//! year = 2023
//! variant = "GXL"
//!
//! [vehicles.capacities]
//! gvm = 3350
//! gcm = 6750
//! btc = 3500
//! tbm = 350
//! fawr = 1500
//! rawr = 1950
//!
//! [[caravans]]
//! make = "Jayco"
//! model = "Journey Outback"
//! year = 2022
//! plate = "1AB-2CD"
//! state = "VIC"
//!
//! [caravans.capacities]
//! atm = 2500
//! gtm = 2300
//! ```
//!
//! Every seed entry is MASTER_VERIFIED. Entries may be incomplete; the
//! resolver reports those as `IncompleteFound`.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;
use towcheck_domain::model::{
    CapacitySet, CaravanCapacities, SpecKey, SpecRecord, StoredSpec, VehicleCapacities,
};
use towcheck_types::{ConfigError, Error, Result};

#[derive(Debug, Deserialize)]
struct SeedEntry<C> {
    make: String,
    model: String,
    year: u16,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    plate: Option<String>,
    #[serde(default)]
    state: Option<String>,
    capacities: C,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    vehicles: Vec<SeedEntry<VehicleCapacities>>,
    #[serde(default)]
    caravans: Vec<SeedEntry<CaravanCapacities>>,
}

/// Master records parsed from a seed file
#[derive(Debug, Clone, Default)]
pub struct RegistrySeed {
    records: Vec<StoredSpec>,
}

impl RegistrySeed {
    /// Load seed data from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(ConfigError::ParseError(format!(
                "Failed to read registry seed {}: {}",
                path.display(),
                e
            )))
        })?;
        Self::load_from_str(&content)
    }

    /// Load seed data from a TOML string
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let seed: SeedFile = toml::from_str(toml_content).map_err(|e| {
            Error::Config(ConfigError::ParseError(format!(
                "Failed to parse registry seed TOML: {}",
                e
            )))
        })?;

        let mut problems = Vec::new();
        let mut records = Vec::with_capacity(seed.vehicles.len() + seed.caravans.len());
        collect("vehicles", seed.vehicles, &mut records, &mut problems);
        collect("caravans", seed.caravans, &mut records, &mut problems);
        if !problems.is_empty() {
            return Err(ConfigError::ParseError(problems.join("; ")).into());
        }

        for record in records.iter().filter(|r| !r.missing_required().is_empty()) {
            warn!(
                identity = %record.identity(),
                missing = ?record.missing_required(),
                "seed record is incomplete"
            );
        }
        Ok(Self { records })
    }

    pub fn into_records(self) -> Vec<StoredSpec> {
        self.records
    }
}

fn collect<C: CapacitySet>(
    section: &str,
    entries: Vec<SeedEntry<C>>,
    records: &mut Vec<StoredSpec>,
    problems: &mut Vec<String>,
) {
    for (index, entry) in entries.into_iter().enumerate() {
        let at = format!("{}[{}]", section, index);
        if entry.make.trim().is_empty() || entry.model.trim().is_empty() {
            problems.push(format!("{}: make and model are required", at));
            continue;
        }
        let mut key = SpecKey::new(entry.make.trim(), entry.model.trim(), entry.year);
        if let Some(variant) = entry.variant.filter(|v| !v.trim().is_empty()) {
            key = key.with_variant(variant.trim());
        }
        match (entry.plate, entry.state) {
            (Some(plate), Some(state)) => key = key.with_plate(plate.trim(), state.trim()),
            (None, None) => {}
            _ => {
                problems.push(format!("{}: plate and state must be given together", at));
                continue;
            }
        }
        records.push(SpecRecord::master(key, entry.capacities).into_stored());
    }
}

//! CSV loader for weigh-session readings
//!
//! One row per weighing, identified by `role`:
//!
//! ```text
//! role,front_left,front_right,rear_left,rear_right,front,rear,gross
//! unhitched,520,510,480,470,,,
//! hitched,560,550,560,540,,,
//! caravan,,,,,,,1660
//! ```
//!
//! Roles are `unhitched`, `hitched`, `caravan`, `whole_combination` and
//! `tow_ball`. A row carries wheel columns, axle columns or `gross`, never a
//! mix. Columns that no row uses may be left out of the header entirely.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use towcheck_domain::model::{AxleReadings, RawReadingSet, TotalReading, WheelReadings};
use towcheck_domain::service::DeltaInput;
use towcheck_types::{ComplianceError, Error, Result, Violations};

#[derive(Debug, Deserialize)]
struct ReadingRow {
    role: String,
    #[serde(default)]
    front_left: Option<f64>,
    #[serde(default)]
    front_right: Option<f64>,
    #[serde(default)]
    rear_left: Option<f64>,
    #[serde(default)]
    rear_right: Option<f64>,
    #[serde(default)]
    front: Option<f64>,
    #[serde(default)]
    rear: Option<f64>,
    #[serde(default)]
    gross: Option<f64>,
}

impl ReadingRow {
    fn into_reading(self, at: &str, violations: &mut Violations) -> Option<RawReadingSet> {
        let wheels = [self.front_left, self.front_right, self.rear_left, self.rear_right];
        let has_wheels = wheels.iter().any(Option::is_some);
        let has_axles = self.front.is_some() || self.rear.is_some();
        let has_gross = self.gross.is_some();

        match (has_wheels, has_axles, has_gross) {
            (true, false, false) => Some(RawReadingSet::Wheels(WheelReadings {
                front_left: self.front_left,
                front_right: self.front_right,
                rear_left: self.rear_left,
                rear_right: self.rear_right,
            })),
            (false, true, false) => Some(RawReadingSet::Axles(AxleReadings {
                front: self.front,
                rear: self.rear,
            })),
            (false, false, true) => Some(RawReadingSet::Total(TotalReading { gross: self.gross })),
            (false, false, false) => {
                violations.push(at, "row has no readings");
                None
            }
            _ => {
                violations.push(at, "row mixes wheel, axle and gross columns");
                None
            }
        }
    }
}

#[derive(Default)]
struct Rows {
    unhitched: Option<RawReadingSet>,
    hitched: Option<RawReadingSet>,
    caravan: Option<RawReadingSet>,
    whole_combination: Option<f64>,
    tow_ball_override: Option<f64>,
}

/// Readings of one session as read from CSV
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingsImport {
    pub unhitched: RawReadingSet,
    pub hitched: Option<RawReadingSet>,
    pub caravan: Option<RawReadingSet>,
    pub whole_combination: Option<f64>,
    pub tow_ball_override: Option<f64>,
}

impl ReadingsImport {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }
        Self::load_from_reader(File::open(path)?)
    }

    /// Parse CSV with a header row. Structural problems in any row are
    /// reported together as `InvalidReading`.
    pub fn load_from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Rows::default();
        let mut violations = Violations::new();
        for (index, row) in csv_reader.deserialize::<ReadingRow>().enumerate() {
            let row = row?;
            let role = row.role.to_lowercase();
            let at = format!("row {} ({})", index + 1, role);
            match role.as_str() {
                "unhitched" => {
                    let reading = row.into_reading(&at, &mut violations);
                    assign(&mut rows.unhitched, reading, &at, &mut violations)
                }
                "hitched" => {
                    let reading = row.into_reading(&at, &mut violations);
                    assign(&mut rows.hitched, reading, &at, &mut violations)
                }
                "caravan" => {
                    let reading = row.into_reading(&at, &mut violations);
                    assign(&mut rows.caravan, reading, &at, &mut violations)
                }
                "whole_combination" => {
                    let gross = gross_only(&row, &at, &mut violations);
                    assign(&mut rows.whole_combination, gross, &at, &mut violations)
                }
                "tow_ball" => {
                    let gross = gross_only(&row, &at, &mut violations);
                    assign(&mut rows.tow_ball_override, gross, &at, &mut violations)
                }
                _ => violations.push(
                    at.as_str(),
                    "unknown role (expected unhitched, hitched, caravan, whole_combination or tow_ball)",
                ),
            }
        }

        match rows.unhitched {
            Some(unhitched) if violations.is_empty() => Ok(Self {
                unhitched,
                hitched: rows.hitched,
                caravan: rows.caravan,
                whole_combination: rows.whole_combination,
                tow_ball_override: rows.tow_ball_override,
            }),
            unhitched => {
                if unhitched.is_none() && violations.is_empty() {
                    violations.push("unhitched", "a row for the unhitched tow vehicle is required");
                }
                Err(ComplianceError::InvalidReading(violations).into())
            }
        }
    }

    /// Overlay onto existing session input; roles present in the CSV replace
    /// the input's readings, the rest are kept
    pub fn apply_to(self, mut input: DeltaInput) -> DeltaInput {
        input.unhitched = self.unhitched;
        if self.hitched.is_some() {
            input.hitched = self.hitched;
        }
        if self.caravan.is_some() {
            input.caravan = self.caravan;
        }
        if self.whole_combination.is_some() {
            input.whole_combination = self.whole_combination;
        }
        if self.tow_ball_override.is_some() {
            input.tow_ball_override = self.tow_ball_override;
        }
        input
    }
}

fn gross_only(row: &ReadingRow, at: &str, violations: &mut Violations) -> Option<f64> {
    let others = [
        row.front_left,
        row.front_right,
        row.rear_left,
        row.rear_right,
        row.front,
        row.rear,
    ];
    if others.iter().any(Option::is_some) {
        violations.push(at, "only the gross column applies to this role");
        return None;
    }
    if row.gross.is_none() {
        violations.push(at, "gross is required");
    }
    row.gross
}

fn assign<T>(slot: &mut Option<T>, value: Option<T>, at: &str, violations: &mut Violations) {
    let Some(value) = value else { return };
    if slot.is_some() {
        violations.push(at, "role appears more than once");
    } else {
        *slot = Some(value);
    }
}

//! Derivation of canonical weights from raw scale and weighbridge readings
//!
//! All functions here are pure. Negative derived values are reported as
//! [`MeasurementWarning`]s and never clamped; clamping is the evaluator's
//! business and only applies to overload.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use towcheck_types::{ComplianceError, Violations};

use crate::model::{
    AxleLoads, CanonicalWeights, MeasurementWarning, RawReadingSet, ReadingShape, TowBallSource,
    WeighingMethod,
};

/// Allowed gap between a measured whole-combination mass and the derived one
pub const DEFAULT_COMBINATION_TOLERANCE_PERCENT: f64 = 1.0;

/// Everything captured in one weigh session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaInput {
    pub method: WeighingMethod,
    /// Tow vehicle alone
    pub unhitched: RawReadingSet,
    /// Tow vehicle with the caravan coupled; used for the residual tow-ball mass
    #[serde(default)]
    pub hitched: Option<RawReadingSet>,
    /// Caravan axle group on its own wheels while still hitched
    #[serde(default)]
    pub caravan: Option<RawReadingSet>,
    /// Whole combination weighed as one unit
    #[serde(default)]
    pub whole_combination: Option<f64>,
    /// Tow-ball mass measured directly at the coupling
    #[serde(default)]
    pub tow_ball_override: Option<f64>,
}

impl DeltaInput {
    pub fn vehicle_only(method: WeighingMethod, unhitched: RawReadingSet) -> Self {
        Self {
            method,
            unhitched,
            hitched: None,
            caravan: None,
            whole_combination: None,
            tow_ball_override: None,
        }
    }

    pub fn with_hitched(mut self, hitched: RawReadingSet) -> Self {
        self.hitched = Some(hitched);
        self
    }

    pub fn with_caravan(mut self, caravan: RawReadingSet) -> Self {
        self.caravan = Some(caravan);
        self
    }

    pub fn with_whole_combination(mut self, gross: f64) -> Self {
        self.whole_combination = Some(gross);
        self
    }

    pub fn with_tow_ball_override(mut self, tow_ball: f64) -> Self {
        self.tow_ball_override = Some(tow_ball);
        self
    }

    pub fn has_caravan(&self) -> bool {
        self.hitched.is_some()
            || self.caravan.is_some()
            || self.whole_combination.is_some()
            || self.tow_ball_override.is_some()
    }
}

/// Turns a [`DeltaInput`] into [`CanonicalWeights`]
#[derive(Debug, Clone, Copy)]
pub struct DeltaCalculator {
    tolerance_percent: f64,
}

impl Default for DeltaCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_COMBINATION_TOLERANCE_PERCENT)
    }
}

impl DeltaCalculator {
    pub fn new(tolerance_percent: f64) -> Self {
        let sanitized = if tolerance_percent.is_finite() && tolerance_percent >= 0.0 {
            tolerance_percent
        } else {
            DEFAULT_COMBINATION_TOLERANCE_PERCENT
        };
        Self {
            tolerance_percent: sanitized,
        }
    }

    /// Validate every reading, then derive the canonical totals.
    ///
    /// Every malformed field across all readings is reported in one
    /// `InvalidReading`.
    pub fn derive(&self, input: &DeltaInput) -> Result<CanonicalWeights, ComplianceError> {
        let mut violations = Violations::new();
        let shape = input.method.expected_shape();

        let unhitched = measure_as(&input.unhitched, "unhitched", Some(shape), &mut violations);
        let hitched = input
            .hitched
            .as_ref()
            .and_then(|r| measure_as(r, "hitched", Some(shape), &mut violations));
        let caravan = input
            .caravan
            .as_ref()
            .and_then(|r| measure_as(r, "caravan", None, &mut violations));
        let whole = direct_value(input.whole_combination, "whole_combination", &mut violations);
        let tow_ball_override =
            direct_value(input.tow_ball_override, "tow_ball_override", &mut violations);

        if input.has_caravan() {
            if input.hitched.is_none() && input.tow_ball_override.is_none() {
                violations.push(
                    "hitched",
                    "required to derive tow-ball mass (or supply tow_ball_override)",
                );
            }
            if input.caravan.is_none() && input.whole_combination.is_none() {
                violations.push(
                    "caravan",
                    "caravan axle-group reading or whole_combination required",
                );
            }
        }

        if !violations.is_empty() {
            return Err(ComplianceError::InvalidReading(violations));
        }
        let unhitched = unhitched.ok_or_else(|| {
            ComplianceError::MissingRequiredInput("unhitched reading".to_string())
        })?;

        let vehicle_only_total = unhitched.total;
        let mut warnings = Vec::new();

        let (tow_ball, tow_ball_source) = match (tow_ball_override, hitched) {
            (Some(direct), _) => (direct, TowBallSource::Direct),
            (None, Some(h)) => (tow_ball_weight(h.total, vehicle_only_total), TowBallSource::Residual),
            (None, None) => (0.0, TowBallSource::None),
        };
        if tow_ball < 0.0 {
            warnings.push(MeasurementWarning::NegativeTowBall {
                tow_ball_weight: tow_ball,
            });
        }

        let caravan_only_total = match (caravan, whole) {
            (Some(c), _) => c.total,
            (None, Some(w)) => w - vehicle_only_total - tow_ball,
            (None, None) => 0.0,
        };
        if caravan_only_total < 0.0 {
            warnings.push(MeasurementWarning::NegativeCaravanMass { caravan_only_total });
        }

        let combined_total = vehicle_only_total + caravan_only_total + tow_ball;
        if let (Some(_), Some(measured)) = (caravan, whole) {
            if exceeds_tolerance(measured, combined_total, self.tolerance_percent) {
                warnings.push(MeasurementWarning::InconsistentCombination {
                    measured,
                    derived: combined_total,
                    tolerance_percent: self.tolerance_percent,
                });
            }
        }

        // Axle loads as driven: coupled when the caravan was hitched
        let axle_source = hitched.unwrap_or(unhitched);

        for warning in &warnings {
            warn!(%warning, "measurement warning");
        }
        debug!(
            vehicle_only_total,
            caravan_only_total, tow_ball, combined_total, "derived canonical weights"
        );

        Ok(CanonicalWeights {
            vehicle_only_total,
            caravan_only_total,
            combined_total,
            tow_ball_weight: tow_ball,
            tow_ball_source,
            front_axle: axle_source.front,
            rear_axle: axle_source.rear,
            warnings,
        })
    }
}

/// Sum of the four wheels, the two axles, or the gross reading
pub fn vehicle_only_total(readings: &RawReadingSet) -> Result<f64, ComplianceError> {
    measure(readings).map(|loads| loads.total)
}

/// Caravan axle-group total; 0 when no caravan is weighed
pub fn caravan_only_total(readings: Option<&RawReadingSet>) -> Result<f64, ComplianceError> {
    match readings {
        Some(r) => measure(r).map(|loads| loads.total),
        None => Ok(0.0),
    }
}

/// Residual tow-ball mass: hitched vehicle reading minus the vehicle alone.
/// May be negative; callers surface that as a warning.
pub fn tow_ball_weight(combined_total: f64, vehicle_only_total: f64) -> f64 {
    combined_total - vehicle_only_total
}

/// Validate one reading set of any shape
pub fn measure(readings: &RawReadingSet) -> Result<AxleLoads, ComplianceError> {
    let mut violations = Violations::new();
    match measure_as(readings, "", None, &mut violations) {
        Some(loads) if violations.is_empty() => Ok(loads),
        _ => Err(ComplianceError::InvalidReading(violations)),
    }
}

fn measure_as(
    readings: &RawReadingSet,
    label: &str,
    expected: Option<ReadingShape>,
    violations: &mut Violations,
) -> Option<AxleLoads> {
    let name = |field: &str| {
        if label.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", label, field)
        }
    };

    if let Some(shape) = expected {
        if readings.shape() != shape {
            violations.push(
                name("shape"),
                format!("expected {} for this weighing method, got {}", shape, readings.shape()),
            );
            return None;
        }
    }

    let before = violations.len();
    let mut values = Vec::new();
    for (field, value) in readings.components() {
        match value {
            None => violations.push(name(field), "is required"),
            Some(v) if !v.is_finite() => violations.push(name(field), "must be a finite number"),
            Some(v) if v < 0.0 => {
                violations.push(name(field), format!("must not be negative (got {})", v))
            }
            Some(v) => values.push(v),
        }
    }
    if violations.len() > before {
        return None;
    }

    let loads = match values.as_slice() {
        [fl, fr, rl, rr] => AxleLoads {
            front: Some(fl + fr),
            rear: Some(rl + rr),
            total: fl + fr + rl + rr,
        },
        [front, rear] => AxleLoads {
            front: Some(*front),
            rear: Some(*rear),
            total: front + rear,
        },
        [gross] => AxleLoads {
            front: None,
            rear: None,
            total: *gross,
        },
        _ => return None,
    };
    Some(loads)
}

fn direct_value(value: Option<f64>, field: &str, violations: &mut Violations) -> Option<f64> {
    match value {
        Some(v) if !v.is_finite() => {
            violations.push(field, "must be a finite number");
            None
        }
        Some(v) if v < 0.0 => {
            violations.push(field, format!("must not be negative (got {})", v));
            None
        }
        other => other,
    }
}

fn exceeds_tolerance(measured: f64, derived: f64, tolerance_percent: f64) -> bool {
    if measured <= 0.0 {
        return derived.abs() > 0.0;
    }
    (measured - derived).abs() / measured * 100.0 > tolerance_percent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AxleReadings, WheelReadings};
    use proptest::prelude::*;

    fn per_wheel() -> WeighingMethod {
        WeighingMethod::PortableScales { per_wheel: true }
    }

    #[test]
    fn test_vehicle_only_total_from_wheels() {
        let total = vehicle_only_total(&RawReadingSet::wheels(520.0, 510.0, 480.0, 470.0)).unwrap();
        assert_eq!(total, 1980.0);
    }

    #[test]
    fn test_vehicle_only_total_from_axles() {
        let total = vehicle_only_total(&RawReadingSet::axles(1150.0, 1350.0)).unwrap();
        assert_eq!(total, 2500.0);
    }

    #[test]
    fn test_negative_component_rejected() {
        let err = vehicle_only_total(&RawReadingSet::wheels(520.0, -1.0, 480.0, 470.0)).unwrap_err();
        match err {
            ComplianceError::InvalidReading(v) => assert_eq!(v.fields(), vec!["front_right"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_components_all_reported() {
        let readings = RawReadingSet::Wheels(WheelReadings {
            front_left: Some(500.0),
            ..Default::default()
        });
        let err = vehicle_only_total(&readings).unwrap_err();
        match err {
            ComplianceError::InvalidReading(v) => {
                assert_eq!(v.fields(), vec!["front_right", "rear_left", "rear_right"])
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_no_caravan_is_zero() {
        assert_eq!(caravan_only_total(None).unwrap(), 0.0);
    }

    #[test]
    fn test_worked_example() {
        let input = DeltaInput::vehicle_only(per_wheel(), RawReadingSet::wheels(520.0, 510.0, 480.0, 470.0))
            .with_caravan(RawReadingSet::wheels(400.0, 410.0, 420.0, 430.0))
            .with_hitched(RawReadingSet::wheels(560.0, 550.0, 520.0, 520.0));
        let weights = DeltaCalculator::default().derive(&input).unwrap();
        assert_eq!(weights.vehicle_only_total, 1980.0);
        assert_eq!(weights.caravan_only_total, 1660.0);
        assert_eq!(weights.tow_ball_weight, 170.0);
        assert_eq!(weights.tow_ball_source, TowBallSource::Residual);
        assert_eq!(weights.combined_total, 3810.0);
        assert_eq!(weights.front_axle, Some(1110.0));
        assert_eq!(weights.rear_axle, Some(1040.0));
        assert!(weights.warnings.is_empty());
    }

    #[test]
    fn test_vehicle_only_session() {
        let input = DeltaInput::vehicle_only(per_wheel(), RawReadingSet::wheels(520.0, 510.0, 480.0, 470.0));
        let weights = DeltaCalculator::default().derive(&input).unwrap();
        assert_eq!(weights.caravan_only_total, 0.0);
        assert_eq!(weights.tow_ball_weight, 0.0);
        assert_eq!(weights.combined_total, 1980.0);
        assert!(!weights.caravan_weighed());
        assert_eq!(weights.front_axle, Some(1030.0));
    }

    #[test]
    fn test_direct_override_wins_over_residual() {
        let input = DeltaInput::vehicle_only(per_wheel(), RawReadingSet::wheels(520.0, 510.0, 480.0, 470.0))
            .with_caravan(RawReadingSet::axles(800.0, 860.0))
            .with_hitched(RawReadingSet::wheels(560.0, 550.0, 520.0, 520.0))
            .with_tow_ball_override(185.0);
        let weights = DeltaCalculator::default().derive(&input).unwrap();
        assert_eq!(weights.tow_ball_weight, 185.0);
        assert_eq!(weights.tow_ball_source, TowBallSource::Direct);
    }

    #[test]
    fn test_negative_tow_ball_is_warned_not_clamped() {
        let input = DeltaInput::vehicle_only(per_wheel(), RawReadingSet::wheels(520.0, 510.0, 480.0, 470.0))
            .with_caravan(RawReadingSet::axles(800.0, 860.0))
            .with_hitched(RawReadingSet::wheels(515.0, 505.0, 480.0, 470.0));
        let weights = DeltaCalculator::default().derive(&input).unwrap();
        assert_eq!(weights.tow_ball_weight, -10.0);
        assert_eq!(
            weights.warnings,
            vec![MeasurementWarning::NegativeTowBall {
                tow_ball_weight: -10.0
            }]
        );
    }

    #[test]
    fn test_caravan_from_whole_combination() {
        let method = WeighingMethod::Weighbridge {
            kind: crate::model::WeighbridgeKind::InGround,
            granularity: crate::model::Granularity::FullVehicle,
        };
        let input = DeltaInput::vehicle_only(method, RawReadingSet::total(2400.0))
            .with_hitched(RawReadingSet::total(2620.0))
            .with_whole_combination(4700.0);
        let weights = DeltaCalculator::default().derive(&input).unwrap();
        assert_eq!(weights.tow_ball_weight, 220.0);
        assert_eq!(weights.caravan_only_total, 2080.0);
        assert_eq!(weights.combined_total, 4700.0);
        assert_eq!(weights.front_axle, None);
        assert_eq!(weights.rear_axle, None);
    }

    #[test]
    fn test_inconsistent_whole_combination_warned() {
        let input = DeltaInput::vehicle_only(per_wheel(), RawReadingSet::wheels(520.0, 510.0, 480.0, 470.0))
            .with_caravan(RawReadingSet::wheels(400.0, 410.0, 420.0, 430.0))
            .with_hitched(RawReadingSet::wheels(560.0, 550.0, 520.0, 520.0))
            .with_whole_combination(4000.0);
        let weights = DeltaCalculator::default().derive(&input).unwrap();
        assert!(matches!(
            weights.warnings.as_slice(),
            [MeasurementWarning::InconsistentCombination { .. }]
        ));
    }

    #[test]
    fn test_shape_mismatch_and_missing_hitched_reported_together() {
        let input = DeltaInput::vehicle_only(per_wheel(), RawReadingSet::axles(1000.0, 1000.0))
            .with_caravan(RawReadingSet::Axles(AxleReadings {
                front: Some(-5.0),
                rear: None,
            }));
        let err = DeltaCalculator::default().derive(&input).unwrap_err();
        match err {
            ComplianceError::InvalidReading(v) => {
                assert!(v.mentions("unhitched.shape"));
                assert!(v.mentions("caravan.front"));
                assert!(v.mentions("caravan.rear"));
                assert!(v.mentions("hitched"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_negative_direct_reading_rejected() {
        let input = DeltaInput::vehicle_only(per_wheel(), RawReadingSet::wheels(520.0, 510.0, 480.0, 470.0))
            .with_caravan(RawReadingSet::axles(800.0, 860.0))
            .with_tow_ball_override(-3.0);
        let err = DeltaCalculator::default().derive(&input).unwrap_err();
        assert!(matches!(err, ComplianceError::InvalidReading(v) if v.mentions("tow_ball_override")));
    }

    proptest! {
        #[test]
        fn wheel_total_is_exact_sum(
            fl in 0.0f64..5000.0,
            fr in 0.0f64..5000.0,
            rl in 0.0f64..5000.0,
            rr in 0.0f64..5000.0,
        ) {
            let total = vehicle_only_total(&RawReadingSet::wheels(fl, fr, rl, rr)).unwrap();
            prop_assert_eq!(total, fl + fr + rl + rr);
        }

        #[test]
        fn tow_ball_round_trips(combined in 0.0f64..10000.0, vehicle in 0.0f64..10000.0) {
            let tow_ball = tow_ball_weight(combined, vehicle);
            let scale = combined.max(vehicle).max(1.0);
            prop_assert!((tow_ball + vehicle - combined).abs() <= f64::EPSILON * scale * 4.0);
        }
    }
}

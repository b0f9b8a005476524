//! Weighing method, raw readings and the canonical weights derived from them

use std::fmt;

use serde::{Deserialize, Serialize};

/// Weighbridge construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeighbridgeKind {
    InGround,
    OnWeigh,
    AboveGround,
}

/// What a weighbridge reports per weighing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Axle,
    FullVehicle,
}

/// How the rig was weighed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeighingMethod {
    PortableScales {
        per_wheel: bool,
    },
    Weighbridge {
        kind: WeighbridgeKind,
        granularity: Granularity,
    },
}

impl WeighingMethod {
    /// Reading shape this method produces for the tow vehicle
    pub fn expected_shape(&self) -> ReadingShape {
        match self {
            WeighingMethod::PortableScales { per_wheel: true } => ReadingShape::Wheels,
            WeighingMethod::PortableScales { per_wheel: false } => ReadingShape::Axles,
            WeighingMethod::Weighbridge {
                granularity: Granularity::Axle,
                ..
            } => ReadingShape::Axles,
            WeighingMethod::Weighbridge {
                granularity: Granularity::FullVehicle,
                ..
            } => ReadingShape::Total,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeighingMethod::PortableScales { per_wheel: true } => "portable scales (per wheel)",
            WeighingMethod::PortableScales { per_wheel: false } => "portable scales (per axle)",
            WeighingMethod::Weighbridge {
                granularity: Granularity::Axle,
                ..
            } => "weighbridge (per axle)",
            WeighingMethod::Weighbridge {
                granularity: Granularity::FullVehicle,
                ..
            } => "weighbridge (full vehicle)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingShape {
    Wheels,
    Axles,
    Total,
}

impl fmt::Display for ReadingShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingShape::Wheels => write!(f, "wheel readings"),
            ReadingShape::Axles => write!(f, "axle readings"),
            ReadingShape::Total => write!(f, "a total reading"),
        }
    }
}

/// Per-wheel scale readings in kg. Fields are optional because raw input may be incomplete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelReadings {
    #[serde(default)]
    pub front_left: Option<f64>,
    #[serde(default)]
    pub front_right: Option<f64>,
    #[serde(default)]
    pub rear_left: Option<f64>,
    #[serde(default)]
    pub rear_right: Option<f64>,
}

impl WheelReadings {
    pub fn new(front_left: f64, front_right: f64, rear_left: f64, rear_right: f64) -> Self {
        Self {
            front_left: Some(front_left),
            front_right: Some(front_right),
            rear_left: Some(rear_left),
            rear_right: Some(rear_right),
        }
    }
}

/// Per-axle (or axle group) readings in kg
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxleReadings {
    #[serde(default)]
    pub front: Option<f64>,
    #[serde(default)]
    pub rear: Option<f64>,
}

impl AxleReadings {
    pub fn new(front: f64, rear: f64) -> Self {
        Self {
            front: Some(front),
            rear: Some(rear),
        }
    }
}

/// A single gross reading with no axle split
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalReading {
    #[serde(default)]
    pub gross: Option<f64>,
}

impl TotalReading {
    pub fn new(gross: f64) -> Self {
        Self { gross: Some(gross) }
    }
}

/// One weighing of one unit, as captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RawReadingSet {
    Wheels(WheelReadings),
    Axles(AxleReadings),
    Total(TotalReading),
}

impl RawReadingSet {
    pub fn wheels(front_left: f64, front_right: f64, rear_left: f64, rear_right: f64) -> Self {
        RawReadingSet::Wheels(WheelReadings::new(front_left, front_right, rear_left, rear_right))
    }

    pub fn axles(front: f64, rear: f64) -> Self {
        RawReadingSet::Axles(AxleReadings::new(front, rear))
    }

    pub fn total(gross: f64) -> Self {
        RawReadingSet::Total(TotalReading::new(gross))
    }

    pub fn shape(&self) -> ReadingShape {
        match self {
            RawReadingSet::Wheels(_) => ReadingShape::Wheels,
            RawReadingSet::Axles(_) => ReadingShape::Axles,
            RawReadingSet::Total(_) => ReadingShape::Total,
        }
    }

    /// Named components in capture order
    pub fn components(&self) -> Vec<(&'static str, Option<f64>)> {
        match self {
            RawReadingSet::Wheels(w) => vec![
                ("front_left", w.front_left),
                ("front_right", w.front_right),
                ("rear_left", w.rear_left),
                ("rear_right", w.rear_right),
            ],
            RawReadingSet::Axles(a) => vec![("front", a.front), ("rear", a.rear)],
            RawReadingSet::Total(t) => vec![("gross", t.gross)],
        }
    }
}

/// Validated loads of one weighing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxleLoads {
    pub front: Option<f64>,
    pub rear: Option<f64>,
    pub total: f64,
}

/// Where the tow-ball mass came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowBallSource {
    /// No caravan was weighed
    None,
    /// Hitched reading minus unhitched reading
    Residual,
    /// Measured at the coupling
    Direct,
}

/// Data-quality findings that do not stop a derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum MeasurementWarning {
    NegativeTowBall {
        tow_ball_weight: f64,
    },
    NegativeCaravanMass {
        caravan_only_total: f64,
    },
    InconsistentCombination {
        measured: f64,
        derived: f64,
        tolerance_percent: f64,
    },
}

impl fmt::Display for MeasurementWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementWarning::NegativeTowBall { tow_ball_weight } => write!(
                f,
                "tow-ball weight is negative ({:.1} kg); the hitched reading is lighter than the unhitched one",
                tow_ball_weight
            ),
            MeasurementWarning::NegativeCaravanMass { caravan_only_total } => write!(
                f,
                "caravan mass is negative ({:.1} kg); check the whole-combination reading",
                caravan_only_total
            ),
            MeasurementWarning::InconsistentCombination {
                measured,
                derived,
                tolerance_percent,
            } => write!(
                f,
                "measured combination {:.1} kg differs from derived {:.1} kg by more than {:.1}%",
                measured, derived, tolerance_percent
            ),
        }
    }
}

/// Canonical weight quantities for one weigh session, in kg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalWeights {
    /// Tow vehicle weighed alone
    pub vehicle_only_total: f64,
    /// Caravan load on its own axles, tow-ball load excluded
    pub caravan_only_total: f64,
    /// Whole combination: vehicle + caravan + tow ball
    pub combined_total: f64,
    pub tow_ball_weight: f64,
    pub tow_ball_source: TowBallSource,
    #[serde(default)]
    pub front_axle: Option<f64>,
    #[serde(default)]
    pub rear_axle: Option<f64>,
    #[serde(default)]
    pub warnings: Vec<MeasurementWarning>,
}

impl CanonicalWeights {
    pub fn caravan_weighed(&self) -> bool {
        self.tow_ball_source != TowBallSource::None
    }

    /// Caravan mass including the share carried by the tow ball
    pub fn caravan_aggregate(&self) -> f64 {
        self.caravan_only_total + self.tow_ball_weight
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_shape_per_method() {
        assert_eq!(
            WeighingMethod::PortableScales { per_wheel: true }.expected_shape(),
            ReadingShape::Wheels
        );
        assert_eq!(
            WeighingMethod::PortableScales { per_wheel: false }.expected_shape(),
            ReadingShape::Axles
        );
        assert_eq!(
            WeighingMethod::Weighbridge {
                kind: WeighbridgeKind::InGround,
                granularity: Granularity::FullVehicle
            }
            .expected_shape(),
            ReadingShape::Total
        );
    }

    #[test]
    fn test_reading_set_json_shape() {
        let json = r#"{"shape":"wheels","front_left":520,"front_right":510,"rear_left":480}"#;
        let set: RawReadingSet = serde_json::from_str(json).unwrap();
        match set {
            RawReadingSet::Wheels(w) => {
                assert_eq!(w.front_left, Some(520.0));
                assert_eq!(w.rear_right, None);
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_method_json_tag() {
        let json = r#"{"type":"weighbridge","kind":"above_ground","granularity":"axle"}"#;
        let method: WeighingMethod = serde_json::from_str(json).unwrap();
        assert_eq!(method.expected_shape(), ReadingShape::Axles);
    }
}

//! Domain model types

pub mod compliance;
pub mod spec_record;
pub mod weigh_result;
pub mod weighing;

pub use compliance::{CheckKind, ComplianceCheck, ComplianceVerdict};
pub use spec_record::{
    normalize_plate, CapacitySet, CaravanCapacities, CaravanSpec, DeclaredKey, DeclaredSpec,
    PlateKey, Provenance, SpecKey, SpecKind, SpecLookup, SpecRecord, StoredSpec,
    VehicleCapacities, VehicleSpec,
};
pub use weigh_result::{SpecSnapshot, WeighResult};
pub use weighing::{
    AxleLoads, AxleReadings, CanonicalWeights, Granularity, MeasurementWarning, RawReadingSet,
    ReadingShape, TotalReading, TowBallSource, WeighbridgeKind, WeighingMethod, WheelReadings,
};

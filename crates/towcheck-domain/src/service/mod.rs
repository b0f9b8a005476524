//! Domain services

pub mod compliance_evaluator;
pub mod delta_calculator;
pub mod provenance_gate;
pub mod spec_resolver;

pub use compliance_evaluator::{evaluate, TOW_BALL_FALLBACK_RATIO};
pub use delta_calculator::{
    caravan_only_total, measure, tow_ball_weight, vehicle_only_total, DeltaCalculator, DeltaInput,
    DEFAULT_COMBINATION_TOLERANCE_PERCENT,
};
pub use provenance_gate::{
    next_provenance, AdminReview, ProvenanceEvent, ProvenanceGate, Submission,
};
pub use spec_resolver::{accept_user_declared, SpecResolver, MIN_MODEL_YEAR};

//! Compliance evaluation of canonical weights against resolved specifications

use std::collections::BTreeMap;

use tracing::debug;
use towcheck_types::ComplianceError;

use crate::model::{
    CanonicalWeights, CaravanSpec, CheckKind, ComplianceCheck, ComplianceVerdict, VehicleSpec,
};

/// Share of caravan ATM used as the TBM limit when the vehicle has no TBM rating
pub const TOW_BALL_FALLBACK_RATIO: f64 = 0.10;

/// Evaluate every applicable check.
///
/// Checks whose limit is absent are omitted, never assumed to pass.
/// Caravan checks (TBM, BTC, ATM, GTM) are present only with a caravan spec.
/// GCM is vehicle + caravan axle group + tow ball; none of the three
/// totals embeds another, so nothing is counted twice.
pub fn evaluate(
    weights: Option<&CanonicalWeights>,
    vehicle: Option<&VehicleSpec>,
    caravan: Option<&CaravanSpec>,
) -> Result<ComplianceVerdict, ComplianceError> {
    let weights = weights
        .ok_or_else(|| ComplianceError::MissingRequiredInput("canonical weights".to_string()))?;
    let vehicle = vehicle
        .ok_or_else(|| ComplianceError::MissingRequiredInput("vehicle specification".to_string()))?;

    let limits = vehicle.capacities();
    let mut checks = BTreeMap::new();
    let mut add = |kind: CheckKind, actual: Option<f64>, limit: Option<f64>| {
        if let (Some(actual), Some(limit)) = (actual, limit) {
            checks.insert(kind, ComplianceCheck::new(actual, limit));
        }
    };

    add(CheckKind::Gvm, Some(weights.vehicle_only_total), limits.gvm);
    add(CheckKind::FrontAxle, weights.front_axle, limits.fawr);
    add(CheckKind::RearAxle, weights.rear_axle, limits.rawr);

    if let Some(caravan) = caravan {
        let caravan_limits = caravan.capacities();
        let tbm_limit = limits
            .tbm
            .or_else(|| caravan_limits.atm.map(|atm| atm * TOW_BALL_FALLBACK_RATIO));

        add(CheckKind::Tbm, Some(weights.tow_ball_weight), tbm_limit);
        add(CheckKind::Btc, Some(weights.caravan_only_total), limits.btc);
        add(CheckKind::Atm, Some(weights.caravan_aggregate()), caravan_limits.atm);
        add(CheckKind::Gtm, Some(weights.caravan_only_total), caravan_limits.gtm);
    }

    add(
        CheckKind::Gcm,
        Some(weights.vehicle_only_total + weights.caravan_only_total + weights.tow_ball_weight),
        limits.gcm,
    );

    let verdict = ComplianceVerdict::from_checks(
        checks,
        vehicle.provenance(),
        caravan.map(|c| c.provenance()),
    );
    debug!(
        checks = verdict.checks.len(),
        overall_compliant = verdict.overall_compliant,
        provisional = verdict.is_provisional(),
        "evaluated compliance"
    );
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CaravanCapacities, DeclaredKey, DeclaredSpec, Provenance, SpecKey, SpecRecord,
        TowBallSource, VehicleCapacities,
    };
    use crate::service::spec_resolver::accept_user_declared;
    use proptest::prelude::*;

    fn vehicle(caps: VehicleCapacities) -> VehicleSpec {
        SpecRecord::master(SpecKey::new("Toyota", "LandCruiser 300", 2023), caps)
    }

    fn caravan(caps: CaravanCapacities) -> CaravanSpec {
        SpecRecord::master(SpecKey::new("Jayco", "Journey", 2022), caps)
    }

    fn ratings() -> VehicleCapacities {
        VehicleCapacities {
            gvm: Some(2200.0),
            gcm: Some(4500.0),
            btc: Some(2000.0),
            tbm: Some(200.0),
            fawr: Some(1200.0),
            rawr: Some(1300.0),
        }
    }

    fn weights(vehicle: f64, caravan: f64, tow_ball: f64) -> CanonicalWeights {
        CanonicalWeights {
            vehicle_only_total: vehicle,
            caravan_only_total: caravan,
            combined_total: vehicle + caravan + tow_ball,
            tow_ball_weight: tow_ball,
            tow_ball_source: if caravan > 0.0 {
                TowBallSource::Residual
            } else {
                TowBallSource::None
            },
            front_axle: Some(1110.0),
            rear_axle: Some(1040.0),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_worked_example_gvm() {
        let w = weights(1980.0, 1660.0, 170.0);
        let c = caravan(CaravanCapacities {
            atm: Some(2000.0),
            gtm: Some(1800.0),
            ..Default::default()
        });
        let verdict = evaluate(Some(&w), Some(&vehicle(ratings())), Some(&c)).unwrap();

        let gvm = verdict.get(CheckKind::Gvm).unwrap();
        assert_eq!(gvm.actual, 1980.0);
        assert!(gvm.compliant);
        assert_eq!(gvm.display_percentage(), 90.0);

        assert_eq!(verdict.get(CheckKind::Atm).unwrap().actual, 1830.0);
        assert_eq!(verdict.get(CheckKind::Gtm).unwrap().actual, 1660.0);
        assert_eq!(verdict.get(CheckKind::Gcm).unwrap().actual, 3810.0);
        assert_eq!(verdict.checks.len(), 8);
        assert!(verdict.overall_compliant);
    }

    #[test]
    fn test_vehicle_only_omits_caravan_checks() {
        let w = weights(1980.0, 0.0, 0.0);
        let verdict = evaluate(Some(&w), Some(&vehicle(ratings())), None).unwrap();
        for kind in [CheckKind::Atm, CheckKind::Gtm, CheckKind::Btc, CheckKind::Tbm] {
            assert!(verdict.get(kind).is_none(), "{:?} should be absent", kind);
        }
        assert!(verdict.get(CheckKind::Gvm).is_some());
        assert!(verdict.get(CheckKind::FrontAxle).is_some());
        assert!(verdict.get(CheckKind::RearAxle).is_some());
        assert!(verdict.overall_compliant);
        assert_eq!(verdict.caravan_provenance, None);
    }

    #[test]
    fn test_caravan_without_vehicle_is_missing_input() {
        let w = weights(1980.0, 1660.0, 170.0);
        let c = caravan(CaravanCapacities {
            atm: Some(2000.0),
            gtm: Some(1800.0),
            ..Default::default()
        });
        let err = evaluate(Some(&w), None, Some(&c)).unwrap_err();
        assert!(matches!(err, ComplianceError::MissingRequiredInput(_)));
    }

    #[test]
    fn test_missing_weights_is_missing_input() {
        let err = evaluate(None, Some(&vehicle(ratings())), None).unwrap_err();
        assert!(matches!(err, ComplianceError::MissingRequiredInput(_)));
    }

    #[test]
    fn test_tbm_falls_back_to_ten_percent_of_atm() {
        let caps = VehicleCapacities {
            tbm: None,
            ..ratings()
        };
        let c = caravan(CaravanCapacities {
            atm: Some(2500.0),
            gtm: Some(2300.0),
            ..Default::default()
        });
        let w = weights(1980.0, 1660.0, 260.0);
        let verdict = evaluate(Some(&w), Some(&vehicle(caps)), Some(&c)).unwrap();
        let tbm = verdict.get(CheckKind::Tbm).unwrap();
        assert!((tbm.limit - 250.0).abs() < 1e-9);
        assert!(!tbm.compliant);
        assert!((tbm.overload - 10.0).abs() < 1e-9);
        assert!(!verdict.overall_compliant);
    }

    #[test]
    fn test_absent_limit_omits_check() {
        let caps = VehicleCapacities {
            tbm: None,
            ..ratings()
        };
        let c = caravan(CaravanCapacities {
            atm: None,
            gtm: Some(1800.0),
            ..Default::default()
        });
        let w = weights(1980.0, 1660.0, 170.0);
        let verdict = evaluate(Some(&w), Some(&vehicle(caps)), Some(&c)).unwrap();
        assert!(verdict.get(CheckKind::Tbm).is_none());
        assert!(verdict.get(CheckKind::Atm).is_none());
        assert!(verdict.get(CheckKind::Gtm).is_some());
    }

    #[test]
    fn test_total_only_readings_skip_axle_checks() {
        let mut w = weights(1980.0, 0.0, 0.0);
        w.front_axle = None;
        w.rear_axle = None;
        let verdict = evaluate(Some(&w), Some(&vehicle(ratings())), None).unwrap();
        assert_eq!(verdict.checks.keys().copied().collect::<Vec<_>>(), vec![CheckKind::Gvm, CheckKind::Gcm]);
    }

    #[test]
    fn test_pending_provenance_carried_into_verdict() {
        let key = DeclaredKey {
            make: "Isuzu".to_string(),
            model: "MU-X".to_string(),
            year: Some(2021.0),
            ..Default::default()
        };
        let declared = accept_user_declared(DeclaredSpec::new(key, ratings()), chrono::Utc::now()).unwrap();
        let w = weights(1980.0, 0.0, 0.0);
        let verdict = evaluate(Some(&w), Some(&declared), None).unwrap();
        assert_eq!(verdict.vehicle_provenance, Provenance::UserProvidedPendingReview);
        assert!(verdict.is_provisional());
    }

    proptest! {
        #[test]
        fn overall_is_conjunction_of_present_checks(
            vehicle_kg in 0.0f64..4000.0,
            caravan_kg in 0.0f64..3500.0,
            tow_ball in -50.0f64..400.0,
            gvm in 0.0f64..4000.0,
            atm in 0.0f64..4000.0,
        ) {
            let caps = VehicleCapacities { gvm: Some(gvm), ..ratings() };
            let c = caravan(CaravanCapacities { atm: Some(atm), gtm: Some(atm), ..Default::default() });
            let w = weights(vehicle_kg, caravan_kg, tow_ball);
            let verdict = evaluate(Some(&w), Some(&vehicle(caps)), Some(&c)).unwrap();

            let any_over = verdict.checks.values().any(|check| check.actual > check.limit);
            prop_assert_eq!(verdict.overall_compliant, !any_over);
            for check in verdict.checks.values() {
                prop_assert!(check.percentage.is_finite());
                prop_assert!(check.overload >= 0.0);
                if check.limit == 0.0 {
                    prop_assert_eq!(check.percentage, 0.0);
                }
            }
        }
    }
}

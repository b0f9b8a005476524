//! Compliance checks and verdicts

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::spec_record::Provenance;

/// Regulatory checks in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckKind {
    Gvm,
    FrontAxle,
    RearAxle,
    Tbm,
    Btc,
    Atm,
    Gtm,
    Gcm,
}

impl CheckKind {
    pub const ALL: [CheckKind; 8] = [
        CheckKind::Gvm,
        CheckKind::FrontAxle,
        CheckKind::RearAxle,
        CheckKind::Tbm,
        CheckKind::Btc,
        CheckKind::Atm,
        CheckKind::Gtm,
        CheckKind::Gcm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CheckKind::Gvm => "GVM",
            CheckKind::FrontAxle => "Front axle",
            CheckKind::RearAxle => "Rear axle",
            CheckKind::Tbm => "TBM",
            CheckKind::Btc => "BTC",
            CheckKind::Atm => "ATM",
            CheckKind::Gtm => "GTM",
            CheckKind::Gcm => "GCM",
        }
    }
}

/// Measured value against its rated limit, both in kg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub actual: f64,
    pub limit: f64,
    pub compliant: bool,
    pub overload: f64,
    pub percentage: f64,
}

impl ComplianceCheck {
    pub fn new(actual: f64, limit: f64) -> Self {
        let percentage = if limit > 0.0 {
            actual / limit * 100.0
        } else {
            0.0
        };
        Self {
            actual,
            limit,
            compliant: actual <= limit,
            overload: (actual - limit).max(0.0),
            percentage,
        }
    }

    /// Percentage rounded to one decimal, for display only
    pub fn display_percentage(&self) -> f64 {
        (self.percentage * 10.0).round() / 10.0
    }
}

/// All applicable checks for one weigh session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub checks: BTreeMap<CheckKind, ComplianceCheck>,
    pub overall_compliant: bool,
    pub vehicle_provenance: Provenance,
    #[serde(default)]
    pub caravan_provenance: Option<Provenance>,
}

impl ComplianceVerdict {
    pub fn from_checks(
        checks: BTreeMap<CheckKind, ComplianceCheck>,
        vehicle_provenance: Provenance,
        caravan_provenance: Option<Provenance>,
    ) -> Self {
        let overall_compliant = checks.values().all(|c| c.compliant);
        Self {
            checks,
            overall_compliant,
            vehicle_provenance,
            caravan_provenance,
        }
    }

    pub fn get(&self, kind: CheckKind) -> Option<&ComplianceCheck> {
        self.checks.get(&kind)
    }

    pub fn failing(&self) -> impl Iterator<Item = (&CheckKind, &ComplianceCheck)> {
        self.checks.iter().filter(|(_, c)| !c.compliant)
    }

    /// True when any spec behind this verdict is still awaiting review
    pub fn is_provisional(&self) -> bool {
        self.vehicle_provenance.is_provisional()
            || self
                .caravan_provenance
                .map(|p| p.is_provisional())
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_within_limit() {
        let check = ComplianceCheck::new(1980.0, 2200.0);
        assert!(check.compliant);
        assert_eq!(check.overload, 0.0);
        assert_eq!(check.display_percentage(), 90.0);
    }

    #[test]
    fn test_check_over_limit() {
        let check = ComplianceCheck::new(2300.0, 2200.0);
        assert!(!check.compliant);
        assert!((check.overload - 100.0).abs() < 1e-9);
        assert_eq!(check.display_percentage(), 104.5);
    }

    #[test]
    fn test_check_at_limit_is_compliant() {
        let check = ComplianceCheck::new(2200.0, 2200.0);
        assert!(check.compliant);
        assert_eq!(check.percentage, 100.0);
    }

    #[test]
    fn test_zero_limit_has_zero_percentage() {
        let check = ComplianceCheck::new(150.0, 0.0);
        assert_eq!(check.percentage, 0.0);
        assert!(!check.compliant);
        assert_eq!(check.overload, 150.0);
    }

    #[test]
    fn test_negative_actual_clamps_overload_only() {
        let check = ComplianceCheck::new(-12.0, 250.0);
        assert!(check.compliant);
        assert_eq!(check.overload, 0.0);
        assert_eq!(check.actual, -12.0);
    }

    #[test]
    fn test_verdict_keys_serialise_camel_case() {
        let mut checks = BTreeMap::new();
        checks.insert(CheckKind::FrontAxle, ComplianceCheck::new(1000.0, 1200.0));
        let verdict = ComplianceVerdict::from_checks(checks, Provenance::MasterVerified, None);
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"frontAxle\""));
        assert!(json.contains("\"MASTER_VERIFIED\""));
        let back: ComplianceVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, verdict);
    }

    #[test]
    fn test_provisional_when_caravan_pending() {
        let verdict = ComplianceVerdict::from_checks(
            BTreeMap::new(),
            Provenance::MasterVerified,
            Some(Provenance::UserProvidedPendingReview),
        );
        assert!(verdict.is_provisional());
        assert!(verdict.overall_compliant);
    }
}

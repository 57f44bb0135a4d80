//! Scholarship eligibility rule.
//!
//! Eligibility is a pure function of the public academic score and the
//! income, where income comes from the verified ledger value if present and
//! from a provisional local decryption otherwise. Missing income always
//! means ineligible.

use serde::{Deserialize, Serialize};

use crate::types::Application;

/// Income must be strictly below this to qualify.
pub const DEFAULT_INCOME_THRESHOLD: u64 = 50_000;
/// Academic score must be at least this to qualify.
pub const DEFAULT_MIN_ACADEMIC_SCORE: u8 = 7;

/// Thresholds for the eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    #[serde(default = "default_income_threshold")]
    pub income_threshold: u64,
    #[serde(default = "default_min_academic_score")]
    pub min_academic_score: u8,
}

fn default_income_threshold() -> u64 { DEFAULT_INCOME_THRESHOLD }
fn default_min_academic_score() -> u8 { DEFAULT_MIN_ACADEMIC_SCORE }

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            income_threshold: DEFAULT_INCOME_THRESHOLD,
            min_academic_score: DEFAULT_MIN_ACADEMIC_SCORE,
        }
    }
}

/// Where the income used for a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeBasis {
    /// Recorded on the ledger; authoritative
    Verified,
    /// Locally decrypted, not yet confirmed on the ledger
    Provisional,
    /// No income data
    Unknown,
}

/// Eligibility decision plus its basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub eligible: bool,
    pub basis: IncomeBasis,
}

impl Assessment {
    /// Only verified-basis decisions are authoritative.
    pub fn is_authoritative(&self) -> bool {
        self.basis == IncomeBasis::Verified
    }
}

impl EligibilityPolicy {
    /// Assess an application.
    ///
    /// A verified income always wins over `provisional_income`.
    pub fn assess(&self, application: &Application, provisional_income: Option<u64>) -> Assessment {
        let (income, basis) = match (application.verification.clear_income(), provisional_income) {
            (Some(income), _) => (Some(income), IncomeBasis::Verified),
            (None, Some(income)) => (Some(income), IncomeBasis::Provisional),
            (None, None) => (None, IncomeBasis::Unknown),
        };

        let eligible = income
            .map(|income| {
                income < self.income_threshold
                    && application.academic_score >= self.min_academic_score
            })
            .unwrap_or(false);

        Assessment { eligible, basis }
    }

    pub fn is_eligible(&self, application: &Application, provisional_income: Option<u64>) -> bool {
        self.assess(application, provisional_income).eligible
    }
}

/// Eligibility under the default policy.
pub fn is_eligible(application: &Application, provisional_income: Option<u64>) -> bool {
    EligibilityPolicy::default().is_eligible(application, provisional_income)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CiphertextHandle, Identity, Verification};

    fn application(score: u8, verification: Verification) -> Application {
        Application {
            id: "scholarship-1".into(),
            applicant_name: "Alice".into(),
            academic_score: score,
            created_at: 1_700_000_000,
            creator: Identity::new("0xa11ce"),
            income_handle: CiphertextHandle::new("0x01"),
            reserved_slot: 0,
            verification,
            locally_decrypted_income: None,
        }
    }

    #[test]
    fn test_unknown_income_is_ineligible() {
        let app = application(10, Verification::Unverified);
        assert!(!is_eligible(&app, None));
        assert_eq!(
            EligibilityPolicy::default().assess(&app, None).basis,
            IncomeBasis::Unknown
        );
    }

    #[test]
    fn test_verified_income_qualifies() {
        let app = application(8, Verification::Verified { clear_income: 40_000 });
        let assessment = EligibilityPolicy::default().assess(&app, None);
        assert!(assessment.eligible);
        assert!(assessment.is_authoritative());
    }

    #[test]
    fn test_low_score_disqualifies_despite_income() {
        let app = application(5, Verification::Verified { clear_income: 30_000 });
        assert!(!is_eligible(&app, None));
    }

    #[test]
    fn test_threshold_is_strict() {
        let app = application(7, Verification::Verified { clear_income: 50_000 });
        assert!(!is_eligible(&app, None));

        let app = application(7, Verification::Verified { clear_income: 49_999 });
        assert!(is_eligible(&app, None));
    }

    #[test]
    fn test_verified_income_overrides_provisional() {
        let app = application(8, Verification::Verified { clear_income: 90_000 });
        let assessment = EligibilityPolicy::default().assess(&app, Some(10_000));
        assert!(!assessment.eligible);
        assert_eq!(assessment.basis, IncomeBasis::Verified);
    }

    #[test]
    fn test_provisional_income_is_not_authoritative() {
        let app = application(8, Verification::Unverified);
        let assessment = EligibilityPolicy::default().assess(&app, Some(10_000));
        assert!(assessment.eligible);
        assert!(!assessment.is_authoritative());
    }

    #[test]
    fn test_pure_for_identical_inputs() {
        let app = application(9, Verification::Unverified);
        assert_eq!(is_eligible(&app, Some(1)), is_eligible(&app, Some(1)));
    }

    #[test]
    fn test_custom_policy() {
        let policy = EligibilityPolicy {
            income_threshold: 20_000,
            min_academic_score: 9,
        };
        let app = application(9, Verification::Verified { clear_income: 15_000 });
        assert!(policy.is_eligible(&app, None));
        assert!(!policy.is_eligible(&application(8, app.verification), None));
    }
}

//! Summary statistics over an application snapshot.

use serde::{Deserialize, Serialize};

use crate::types::Application;

/// Window for "recent" applications.
pub const RECENT_WINDOW_SECS: u64 = 60 * 60 * 24 * 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationStats {
    pub total: usize,
    pub verified: usize,
    /// 0.0 when there are no applications
    pub average_academic_score: f64,
    /// Created within the last seven days
    pub recent: usize,
}

impl ApplicationStats {
    /// Compute stats relative to `now` (seconds since epoch).
    pub fn compute(applications: &[Application], now: u64) -> Self {
        let total = applications.len();
        if total == 0 {
            return Self::default();
        }

        let verified = applications.iter().filter(|a| a.is_verified()).count();
        let score_sum: u64 = applications.iter().map(|a| a.academic_score as u64).sum();
        let recent = applications
            .iter()
            .filter(|a| now.saturating_sub(a.created_at) < RECENT_WINDOW_SECS)
            .count();

        Self {
            total,
            verified,
            average_academic_score: score_sum as f64 / total as f64,
            recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CiphertextHandle, Identity, Verification};

    fn application(score: u8, created_at: u64, verified: bool) -> Application {
        Application {
            id: format!("scholarship-{}", created_at),
            applicant_name: "Applicant".into(),
            academic_score: score,
            created_at,
            creator: Identity::new("0xa"),
            income_handle: CiphertextHandle::new("0x01"),
            reserved_slot: 0,
            verification: if verified {
                Verification::Verified { clear_income: 1 }
            } else {
                Verification::Unverified
            },
            locally_decrypted_income: None,
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(ApplicationStats::compute(&[], 100), ApplicationStats::default());
    }

    #[test]
    fn test_counts_and_average() {
        let now = 10 * RECENT_WINDOW_SECS;
        let apps = vec![
            application(8, now - 10, true),
            application(6, now - RECENT_WINDOW_SECS, false),
            application(10, now - 2 * RECENT_WINDOW_SECS, true),
        ];

        let stats = ApplicationStats::compute(&apps, now);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.verified, 2);
        assert_eq!(stats.recent, 1);
        assert!((stats.average_academic_score - 8.0).abs() < f64::EPSILON);
    }
}

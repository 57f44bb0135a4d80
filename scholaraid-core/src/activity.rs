//! Per-session activity history.
//!
//! Records what the connected party did (applications submitted, incomes
//! decrypted). Newest entries first, bounded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default maximum entries before pruning.
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 100;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityKind {
    Applied {
        application_id: String,
        applicant_name: String,
    },
    Decrypted {
        application_id: String,
        clear_income: u64,
    },
}

/// An entry in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub entry_id: String,
    pub kind: ActivityKind,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            kind,
            recorded_at: Utc::now(),
        }
    }
}

impl fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = self.recorded_at.format("%H:%M:%S");
        match &self.kind {
            ActivityKind::Applied { applicant_name, .. } => {
                write!(f, "Applied for {} at {}", applicant_name, at)
            }
            ActivityKind::Decrypted { clear_income, .. } => {
                write!(f, "Decrypted income data: ${} at {}", clear_income, at)
            }
        }
    }
}

/// Bounded, newest-first activity log.
pub struct ActivityLog {
    entries: Arc<RwLock<VecDeque<ActivityEntry>>>,
    max_entries: usize,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_ACTIVITY_CAPACITY)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// Append an entry, pruning the oldest past capacity.
    pub async fn record(&self, kind: ActivityKind) -> ActivityEntry {
        let entry = ActivityEntry::new(kind);

        let mut entries = self.entries.write().await;
        entries.push_front(entry.clone());
        while entries.len() > self.max_entries {
            entries.pop_back();
        }

        entry
    }

    /// Newest `limit` entries.
    pub async fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let entries = self.entries.read().await;
        entries.iter().take(limit).cloned().collect()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(id: &str) -> ActivityKind {
        ActivityKind::Applied {
            application_id: id.into(),
            applicant_name: "Alice".into(),
        }
    }

    #[tokio::test]
    async fn test_newest_first_and_pruned() {
        let log = ActivityLog::with_max_entries(3);
        for i in 0..5 {
            log.record(applied(&format!("scholarship-{}", i))).await;
        }

        let recent = log.recent(10).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].kind, applied("scholarship-4"));
        assert_eq!(recent[2].kind, applied("scholarship-2"));
    }

    #[tokio::test]
    async fn test_recent_limit_and_clear() {
        let log = ActivityLog::new();
        log.record(applied("scholarship-1")).await;
        log.record(ActivityKind::Decrypted {
            application_id: "scholarship-1".into(),
            clear_income: 40_000,
        })
        .await;
        log.record(applied("scholarship-2")).await;

        let recent = log.recent(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, applied("scholarship-2"));

        log.clear().await;
        assert!(log.recent(10).await.is_empty());
    }

    #[test]
    fn test_display() {
        let entry = ActivityEntry::new(ActivityKind::Decrypted {
            application_id: "scholarship-1".into(),
            clear_income: 40_000,
        });
        assert!(entry.to_string().starts_with("Decrypted income data: $40000 at "));
    }
}

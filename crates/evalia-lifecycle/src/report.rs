//! Structured outcomes returned by the reconciliation operations.

use chrono::{DateTime, Utc};
use evalia_core::period::PeriodStatus;
use serde::Serialize;
use uuid::Uuid;

/// Result of reconciling a single period.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// A forward transition was applied and written.
    Transitioned {
        previous_status: PeriodStatus,
        new_status: PeriodStatus,
    },
    /// Stored status already matches, or the derived status is not reachable
    /// through the transition table. Nothing was written.
    Unchanged { status: PeriodStatus },
}

impl ReconcileOutcome {
    pub fn updated(&self) -> bool {
        matches!(self, ReconcileOutcome::Transitioned { .. })
    }
}

/// One transition applied during a sweep.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SweepDetail {
    pub id: Uuid,
    pub name: String,
    pub previous_status: PeriodStatus,
    pub new_status: PeriodStatus,
}

/// Aggregate result of a bulk reconciliation sweep.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub updated_count: usize,
    pub activated_count: usize,
    pub finished_count: usize,
    pub details: Vec<SweepDetail>,
}

/// A period as seen by the dry-run inspection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InspectedPeriod {
    pub id: Uuid,
    pub name: String,
    pub stored_status: PeriodStatus,
    pub derived_status: PeriodStatus,
}

/// Result of a dry-run inspection: every non-cancelled period partitioned by
/// whether its stored status matches the time-derived one. Read-only.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InspectionReport {
    pub checked_at: DateTime<Utc>,
    pub needing_update: Vec<InspectedPeriod>,
    pub correct: Vec<InspectedPeriod>,
}

impl InspectionReport {
    pub fn total(&self) -> usize {
        self.needing_update.len() + self.correct.len()
    }
}

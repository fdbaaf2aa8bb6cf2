//! Evaluation-period data model — the core records the lifecycle engine
//! operates on, and the forward-only status transition table.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an evaluation period.
///
/// `Cancelled` is absorbing: nothing automatic ever leaves it. Every other
/// status is derived from the period's date window and the current time, but
/// automatic transitions only ever move forward (see [`forward_targets`]).
///
/// [`forward_targets`]: PeriodStatus::forward_targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodStatus {
    Planned,
    Active,
    Finished,
    Cancelled,
}

impl PeriodStatus {
    /// Stable wire/storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodStatus::Planned => "PLANNED",
            PeriodStatus::Active => "ACTIVE",
            PeriodStatus::Finished => "FINISHED",
            PeriodStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse the storage representation back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLANNED" => Some(PeriodStatus::Planned),
            "ACTIVE" => Some(PeriodStatus::Active),
            "FINISHED" => Some(PeriodStatus::Finished),
            "CANCELLED" => Some(PeriodStatus::Cancelled),
            _ => None,
        }
    }

    /// The automatic transition table. A status change is applied by the
    /// lifecycle engine only if the target appears here:
    ///
    /// ```text
    /// PLANNED   → { ACTIVE }
    /// ACTIVE    → { FINISHED }
    /// FINISHED  → { }
    /// CANCELLED → { }
    /// ```
    pub fn forward_targets(self) -> &'static [PeriodStatus] {
        match self {
            PeriodStatus::Planned => &[PeriodStatus::Active],
            PeriodStatus::Active => &[PeriodStatus::Finished],
            PeriodStatus::Finished => &[],
            PeriodStatus::Cancelled => &[],
        }
    }

    /// Whether the engine may advance from `self` to `target`.
    pub fn can_advance_to(self, target: PeriodStatus) -> bool {
        self.forward_targets().contains(&target)
    }

    /// Terminal for the lifecycle engine: no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        self.forward_targets().is_empty()
    }
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, time-bounded window during which evaluations may be submitted.
///
/// `start_date` and `end_date` are inclusive boundaries. `start_date <=
/// end_date` is enforced where periods are created, not re-validated by the
/// lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationPeriod {
    pub id: Uuid,
    /// Unique display label.
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    pub created_at: DateTime<Utc>,
    /// Rewritten whenever the status changes.
    pub updated_at: DateTime<Utc>,
}

impl EvaluationPeriod {
    /// Create a new period with a caller-supplied status.
    pub fn new(
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: PeriodStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            start_date,
            end_date,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this period's date window overlaps another inclusive window.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// A performance evaluation recorded against an active period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub id: Uuid,
    pub period_id: Uuid,
    /// Identifier of the employee being evaluated.
    pub employee: String,
    /// Score on a 0..=10 scale.
    pub score: f64,
    #[serde(default)]
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    pub fn new(
        period_id: Uuid,
        employee: &str,
        score: f64,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            period_id,
            employee: employee.to_string(),
            score,
            comments,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table_is_forward_only() {
        assert!(PeriodStatus::Planned.can_advance_to(PeriodStatus::Active));
        assert!(PeriodStatus::Active.can_advance_to(PeriodStatus::Finished));

        // No skips, no regressions, no exits from terminal states.
        assert!(!PeriodStatus::Planned.can_advance_to(PeriodStatus::Finished));
        assert!(!PeriodStatus::Active.can_advance_to(PeriodStatus::Planned));
        assert!(!PeriodStatus::Finished.can_advance_to(PeriodStatus::Active));
        assert!(!PeriodStatus::Cancelled.can_advance_to(PeriodStatus::Active));
        assert!(!PeriodStatus::Cancelled.can_advance_to(PeriodStatus::Finished));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PeriodStatus::Planned.is_terminal());
        assert!(!PeriodStatus::Active.is_terminal());
        assert!(PeriodStatus::Finished.is_terminal());
        assert!(PeriodStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        for s in [
            PeriodStatus::Planned,
            PeriodStatus::Active,
            PeriodStatus::Finished,
            PeriodStatus::Cancelled,
        ] {
            assert_eq!(PeriodStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(PeriodStatus::parse("OPEN"), None);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&PeriodStatus::Planned).unwrap();
        assert_eq!(json, "\"PLANNED\"");
    }

    #[test]
    fn test_overlap() {
        let now = Utc::now();
        let p = EvaluationPeriod::new(
            "2024-Q1",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            PeriodStatus::Planned,
            now,
        );
        // Touching boundaries count as overlap — the windows are inclusive.
        assert!(p.overlaps(
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
        ));
        assert!(!p.overlaps(
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
        ));
    }
}

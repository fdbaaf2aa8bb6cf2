//! # Evalia Store
//!
//! SQLite-backed persistence for evaluation periods and the evaluations
//! recorded against them. The lifecycle engine is written against the
//! [`PeriodStore`] trait, not the concrete store — that seam is also what
//! lets tests inject failing stores to exercise the non-propagating hook.

pub mod error;
pub mod sqlite;

pub use error::StoreError;
pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};
use evalia_core::period::{Evaluation, EvaluationPeriod, PeriodStatus};
use uuid::Uuid;

/// Persistence operations the lifecycle engine and gateway depend on.
///
/// Calls are synchronous; the SQLite implementation serializes access behind
/// a mutex and callers in async context treat each call as a short blocking
/// section, the same way the gateway treats its other stores.
pub trait PeriodStore: Send + Sync {
    /// Insert a new period. Fails if the name is already taken.
    fn insert_period(&self, period: &EvaluationPeriod) -> Result<(), StoreError>;

    /// Fetch one period by id.
    fn period(&self, id: Uuid) -> Result<Option<EvaluationPeriod>, StoreError>;

    /// Fetch one period by its unique name.
    fn period_by_name(&self, name: &str) -> Result<Option<EvaluationPeriod>, StoreError>;

    /// All periods, ordered by start date.
    fn list_periods(&self) -> Result<Vec<EvaluationPeriod>, StoreError>;

    /// All periods except cancelled ones, ordered by start date.
    fn non_cancelled_periods(&self) -> Result<Vec<EvaluationPeriod>, StoreError>;

    /// The sweep pre-filter: exactly the rows eligible for a forward
    /// transition on `today` — `PLANNED` rows whose window contains `today`,
    /// and `ACTIVE` rows whose window has passed.
    fn due_for_transition(&self, today: NaiveDate) -> Result<Vec<EvaluationPeriod>, StoreError>;

    /// Rewrite the status/updated_at pair of one period. A single-row update;
    /// the sweep issues these individually, with no wrapping transaction.
    fn update_status(
        &self,
        id: Uuid,
        status: PeriodStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Non-cancelled periods whose inclusive window overlaps [start, end].
    fn overlapping_periods(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<EvaluationPeriod>, StoreError>;

    /// Record an evaluation.
    fn insert_evaluation(&self, evaluation: &Evaluation) -> Result<(), StoreError>;

    /// Evaluations recorded against a period, newest first.
    fn evaluations_for_period(&self, period_id: Uuid) -> Result<Vec<Evaluation>, StoreError>;
}

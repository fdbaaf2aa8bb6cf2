//! The reconciliation engine — compares stored statuses against time-derived
//! ones and applies forward transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use evalia_core::period::PeriodStatus;
use evalia_store::{PeriodStore, StoreError};
use thiserror::Error;
use uuid::Uuid;

use crate::report::{InspectedPeriod, InspectionReport, ReconcileOutcome, SweepDetail, SweepReport};
use crate::status::derive_status;

/// Injected current-time source.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Errors surfaced by reconciliation operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Period not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The reconciliation engine.
///
/// Holds the store and a clock; every operation reads the clock exactly once
/// and threads that instant through derivation and writes.
pub struct Reconciler<S> {
    store: Arc<S>,
    clock: Clock,
}

impl<S> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: PeriodStore> Reconciler<S> {
    /// Create a reconciler on the wall clock.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(Utc::now))
    }

    /// Create a reconciler with an injected clock (tests, replays).
    pub fn with_clock(store: Arc<S>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Reconcile one period by id.
    ///
    /// Applies a transition only if the `(stored, derived)` pair is in the
    /// transition table — `PLANNED → ACTIVE` or `ACTIVE → FINISHED`. Every
    /// other combination is a no-op, which is what makes repeated calls
    /// idempotent and regressions impossible. On transition, `status` and
    /// `updated_at` are rewritten in a single update.
    pub fn reconcile_one(&self, id: Uuid) -> Result<ReconcileOutcome, LifecycleError> {
        let period = self.store.period(id)?.ok_or(LifecycleError::NotFound(id))?;
        let now = self.now();
        let derived = derive_status(period.start_date, period.end_date, period.status, now);

        if !period.status.can_advance_to(derived) {
            return Ok(ReconcileOutcome::Unchanged {
                status: period.status,
            });
        }

        self.store.update_status(id, derived, now)?;
        tracing::info!(
            "Period '{}' transitioned {} -> {}",
            period.name,
            period.status,
            derived
        );
        Ok(ReconcileOutcome::Transitioned {
            previous_status: period.status,
            new_status: derived,
        })
    }

    /// Bulk sweep over all periods needing a transition.
    ///
    /// One pre-filtered read selects exactly the eligible rows; each row is
    /// then updated individually, with no wrapping transaction. A write
    /// failure partway through leaves earlier updates committed and aborts
    /// the sweep with no partial counts — the dry run is the recovery tool.
    pub fn reconcile_all(&self) -> Result<SweepReport, LifecycleError> {
        let now = self.now();
        let due = self.store.due_for_transition(now.date_naive())?;

        let mut report = SweepReport::default();
        for period in due {
            let derived = derive_status(period.start_date, period.end_date, period.status, now);
            if !period.status.can_advance_to(derived) {
                // The pre-filter and the table agree on eligible rows; this
                // only skips rows mutated between the read and this check.
                continue;
            }
            self.store.update_status(period.id, derived, now)?;
            match derived {
                PeriodStatus::Active => report.activated_count += 1,
                PeriodStatus::Finished => report.finished_count += 1,
                _ => {}
            }
            report.updated_count += 1;
            report.details.push(SweepDetail {
                id: period.id,
                name: period.name,
                previous_status: period.status,
                new_status: derived,
            });
        }

        if report.updated_count > 0 {
            tracing::info!(
                "Sweep applied {} transition(s): {} activated, {} finished",
                report.updated_count,
                report.activated_count,
                report.finished_count
            );
        }
        Ok(report)
    }

    /// Dry run: partition all non-cancelled periods by whether their stored
    /// status matches the derived one. Writes nothing.
    pub fn inspect_pending(&self) -> Result<InspectionReport, LifecycleError> {
        let now = self.now();
        let mut needing_update = Vec::new();
        let mut correct = Vec::new();

        for period in self.store.non_cancelled_periods()? {
            let derived = derive_status(period.start_date, period.end_date, period.status, now);
            let inspected = InspectedPeriod {
                id: period.id,
                name: period.name,
                stored_status: period.status,
                derived_status: derived,
            };
            if derived == period.status {
                correct.push(inspected);
            } else {
                needing_update.push(inspected);
            }
        }

        Ok(InspectionReport {
            checked_at: now,
            needing_update,
            correct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use evalia_core::period::EvaluationPeriod;
    use evalia_store::SqliteStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fixed(now: &str) -> Clock {
        let at: DateTime<Utc> = now.parse().unwrap();
        Arc::new(move || at)
    }

    fn reconciler(now: &str) -> (Arc<SqliteStore>, Reconciler<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let r = Reconciler::with_clock(store.clone(), fixed(now));
        (store, r)
    }

    fn seed(
        store: &SqliteStore,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
        status: PeriodStatus,
    ) -> Uuid {
        let p = EvaluationPeriod::new(name, start, end, status, Utc::now());
        store.insert_period(&p).unwrap();
        p.id
    }

    #[test]
    fn test_reconcile_one_activates_then_idempotent() {
        let (store, r) = reconciler("2024-01-15T12:00:00Z");
        let id = seed(&store, "q1", d(2024, 1, 1), d(2024, 3, 31), PeriodStatus::Planned);

        assert_eq!(
            r.reconcile_one(id).unwrap(),
            ReconcileOutcome::Transitioned {
                previous_status: PeriodStatus::Planned,
                new_status: PeriodStatus::Active,
            }
        );
        // Second pass finds nothing to do.
        assert_eq!(
            r.reconcile_one(id).unwrap(),
            ReconcileOutcome::Unchanged {
                status: PeriodStatus::Active,
            }
        );
    }

    #[test]
    fn test_reconcile_one_finishes_expired_active() {
        let (store, r) = reconciler("2024-04-01T00:00:00Z");
        let id = seed(&store, "q1", d(2024, 1, 1), d(2024, 3, 31), PeriodStatus::Active);

        let outcome = r.reconcile_one(id).unwrap();
        assert!(outcome.updated());
        assert_eq!(
            store.period(id).unwrap().unwrap().status,
            PeriodStatus::Finished
        );
    }

    #[test]
    fn test_reconcile_one_updates_timestamp_from_clock() {
        let (store, r) = reconciler("2024-01-15T12:00:00Z");
        let id = seed(&store, "q1", d(2024, 1, 1), d(2024, 3, 31), PeriodStatus::Planned);

        r.reconcile_one(id).unwrap();
        let back = store.period(id).unwrap().unwrap();
        assert_eq!(back.updated_at, "2024-01-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_finished_never_regresses() {
        // Clock skew scenario: the stored status says FINISHED but the clock
        // lands inside the window, so derivation says ACTIVE.
        let (store, r) = reconciler("2024-02-15T00:00:00Z");
        let id = seed(&store, "q1", d(2024, 1, 1), d(2024, 3, 31), PeriodStatus::Finished);

        assert_eq!(
            r.reconcile_one(id).unwrap(),
            ReconcileOutcome::Unchanged {
                status: PeriodStatus::Finished,
            }
        );
        assert_eq!(
            store.period(id).unwrap().unwrap().status,
            PeriodStatus::Finished
        );
    }

    #[test]
    fn test_cancelled_untouched() {
        let (store, r) = reconciler("2024-02-15T00:00:00Z");
        let id = seed(&store, "q1", d(2024, 1, 1), d(2024, 3, 31), PeriodStatus::Cancelled);

        assert!(!r.reconcile_one(id).unwrap().updated());
    }

    #[test]
    fn test_planned_past_window_stays_planned() {
        // The table has no PLANNED -> FINISHED entry: a period whose whole
        // window was missed is left for an operator, visible via inspect.
        let (store, r) = reconciler("2024-06-01T00:00:00Z");
        let id = seed(&store, "missed", d(2024, 1, 1), d(2024, 1, 31), PeriodStatus::Planned);

        assert!(!r.reconcile_one(id).unwrap().updated());
        let report = r.inspect_pending().unwrap();
        assert_eq!(report.needing_update.len(), 1);
        assert_eq!(report.needing_update[0].id, id);
        assert_eq!(report.needing_update[0].derived_status, PeriodStatus::Finished);
    }

    #[test]
    fn test_reconcile_one_not_found() {
        let (_store, r) = reconciler("2024-01-15T12:00:00Z");
        match r.reconcile_one(Uuid::new_v4()) {
            Err(LifecycleError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_sweep_completeness() {
        let (store, r) = reconciler("2024-02-15T12:00:00Z");
        // Three PLANNED periods, exactly one containing the clock instant.
        let hit = seed(&store, "feb", d(2024, 2, 1), d(2024, 2, 28), PeriodStatus::Planned);
        seed(&store, "mar", d(2024, 3, 1), d(2024, 3, 31), PeriodStatus::Planned);
        seed(&store, "apr", d(2024, 4, 1), d(2024, 4, 30), PeriodStatus::Planned);

        let report = r.reconcile_all().unwrap();
        assert_eq!(report.updated_count, 1);
        assert_eq!(report.activated_count, 1);
        assert_eq!(report.finished_count, 0);
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.details[0].id, hit);
        assert_eq!(report.details[0].previous_status, PeriodStatus::Planned);
        assert_eq!(report.details[0].new_status, PeriodStatus::Active);
    }

    #[test]
    fn test_sweep_mixed_transitions() {
        let (store, r) = reconciler("2024-03-10T08:00:00Z");
        seed(&store, "running", d(2024, 3, 1), d(2024, 3, 31), PeriodStatus::Planned);
        seed(&store, "over", d(2024, 1, 1), d(2024, 2, 29), PeriodStatus::Active);
        seed(&store, "done", d(2023, 1, 1), d(2023, 12, 31), PeriodStatus::Finished);
        seed(&store, "void", d(2024, 3, 1), d(2024, 3, 31), PeriodStatus::Cancelled);

        let report = r.reconcile_all().unwrap();
        assert_eq!(report.updated_count, 2);
        assert_eq!(report.activated_count, 1);
        assert_eq!(report.finished_count, 1);

        // Idempotent: a second sweep finds nothing.
        assert_eq!(r.reconcile_all().unwrap(), SweepReport::default());
    }

    #[test]
    fn test_inspect_writes_nothing() {
        let (store, r) = reconciler("2024-02-15T12:00:00Z");
        let id = seed(&store, "feb", d(2024, 2, 1), d(2024, 2, 28), PeriodStatus::Planned);

        let report = r.inspect_pending().unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.needing_update.len(), 1);
        assert_eq!(report.correct.len(), 0);
        // Still PLANNED — inspection is read-only.
        assert_eq!(
            store.period(id).unwrap().unwrap().status,
            PeriodStatus::Planned
        );
    }

    #[test]
    fn test_end_to_end_window_around_now() {
        // Wall-clock variant of the whole flow: a period spanning yesterday
        // to tomorrow, created PLANNED, activates exactly once.
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let r = Reconciler::new(store.clone());
        let today = Utc::now().date_naive();
        let id = seed(
            &store,
            "current",
            today - chrono::Duration::days(1),
            today + chrono::Duration::days(1),
            PeriodStatus::Planned,
        );

        assert_eq!(
            r.reconcile_one(id).unwrap(),
            ReconcileOutcome::Transitioned {
                previous_status: PeriodStatus::Planned,
                new_status: PeriodStatus::Active,
            }
        );
        assert_eq!(
            r.reconcile_one(id).unwrap(),
            ReconcileOutcome::Unchanged {
                status: PeriodStatus::Active,
            }
        );
    }
}

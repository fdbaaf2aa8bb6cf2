//! Pre-operation reconciliation hook.
//!
//! Invoked immediately before operations that depend on period statuses
//! being current (listing, creating with overlap validation, recording
//! evaluations). The hook must never block the operation it guards:
//! failures are logged here and folded into the returned [`HookOutcome`],
//! which the caller is free to discard.

use serde::Serialize;
use uuid::Uuid;

use evalia_store::PeriodStore;

use crate::reconciler::Reconciler;
use crate::report::{ReconcileOutcome, SweepReport};

/// Per-period result collected when the hook is given explicit ids.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HookTarget {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ReconcileOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the hook did. Not a `Result` on purpose: callers proceed either way,
/// and discarding this value is the expected usage at most call sites.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "hook", rename_all = "snake_case")]
pub enum HookOutcome {
    /// Full sweep ran.
    Swept(SweepReport),
    /// Only the given periods were reconciled, in order.
    Reconciled(Vec<HookTarget>),
    /// The sweep itself failed; the guarded operation proceeds with
    /// possibly stale statuses.
    Failed { message: String },
}

impl HookOutcome {
    pub fn failed(&self) -> bool {
        match self {
            HookOutcome::Failed { .. } => true,
            HookOutcome::Reconciled(targets) => targets.iter().any(|t| t.error.is_some()),
            HookOutcome::Swept(_) => false,
        }
    }
}

impl<S: PeriodStore> Reconciler<S> {
    /// Reconcile opportunistically before a dependent operation.
    ///
    /// With `period_ids`, each named period is reconciled sequentially; a
    /// failure on one is recorded and the rest still run. Without ids, a
    /// full sweep runs. No error ever escapes this method.
    pub fn before_operation(&self, period_ids: Option<&[Uuid]>) -> HookOutcome {
        match period_ids {
            Some(ids) => {
                let mut targets = Vec::with_capacity(ids.len());
                for &id in ids {
                    match self.reconcile_one(id) {
                        Ok(outcome) => targets.push(HookTarget {
                            id,
                            outcome: Some(outcome),
                            error: None,
                        }),
                        Err(e) => {
                            tracing::warn!("Reconciliation hook skipped period {id}: {e}");
                            targets.push(HookTarget {
                                id,
                                outcome: None,
                                error: Some(e.to_string()),
                            });
                        }
                    }
                }
                HookOutcome::Reconciled(targets)
            }
            None => match self.reconcile_all() {
                Ok(report) => HookOutcome::Swept(report),
                Err(e) => {
                    tracing::warn!("Reconciliation hook sweep failed: {e}");
                    HookOutcome::Failed {
                        message: e.to_string(),
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::Clock;
    use chrono::{DateTime, NaiveDate, Utc};
    use evalia_core::period::{Evaluation, EvaluationPeriod, PeriodStatus};
    use evalia_store::{SqliteStore, StoreError};
    use std::sync::Arc;

    /// A store whose every call fails — exercises the non-propagation
    /// guarantee of the hook.
    struct FailingStore;

    fn injected<T>() -> Result<T, StoreError> {
        Err(StoreError::Corrupt("injected failure".into()))
    }

    impl PeriodStore for FailingStore {
        fn insert_period(&self, _: &EvaluationPeriod) -> Result<(), StoreError> {
            injected()
        }
        fn period(&self, _: uuid::Uuid) -> Result<Option<EvaluationPeriod>, StoreError> {
            injected()
        }
        fn period_by_name(&self, _: &str) -> Result<Option<EvaluationPeriod>, StoreError> {
            injected()
        }
        fn list_periods(&self) -> Result<Vec<EvaluationPeriod>, StoreError> {
            injected()
        }
        fn non_cancelled_periods(&self) -> Result<Vec<EvaluationPeriod>, StoreError> {
            injected()
        }
        fn due_for_transition(&self, _: NaiveDate) -> Result<Vec<EvaluationPeriod>, StoreError> {
            injected()
        }
        fn update_status(
            &self,
            _: uuid::Uuid,
            _: PeriodStatus,
            _: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            injected()
        }
        fn overlapping_periods(
            &self,
            _: NaiveDate,
            _: NaiveDate,
        ) -> Result<Vec<EvaluationPeriod>, StoreError> {
            injected()
        }
        fn insert_evaluation(&self, _: &Evaluation) -> Result<(), StoreError> {
            injected()
        }
        fn evaluations_for_period(&self, _: uuid::Uuid) -> Result<Vec<Evaluation>, StoreError> {
            injected()
        }
    }

    fn fixed(now: &str) -> Clock {
        let at: DateTime<Utc> = now.parse().unwrap();
        Arc::new(move || at)
    }

    #[test]
    fn test_sweep_failure_is_swallowed() {
        let r = Reconciler::new(Arc::new(FailingStore));
        let outcome = r.before_operation(None);
        assert!(outcome.failed());
        match outcome {
            HookOutcome::Failed { message } => assert!(message.contains("injected failure")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_per_id_failure_is_recorded_not_raised() {
        let r = Reconciler::new(Arc::new(FailingStore));
        let ids = [uuid::Uuid::new_v4(), uuid::Uuid::new_v4()];
        let outcome = r.before_operation(Some(&ids));

        match &outcome {
            HookOutcome::Reconciled(targets) => {
                // Both targets attempted despite the first failing.
                assert_eq!(targets.len(), 2);
                assert!(targets.iter().all(|t| t.error.is_some()));
            }
            other => panic!("expected Reconciled, got {other:?}"),
        }
        assert!(outcome.failed());
    }

    #[test]
    fn test_hook_sweeps_when_no_ids_given() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let r = Reconciler::with_clock(store.clone(), fixed("2024-02-15T12:00:00Z"));
        let p = EvaluationPeriod::new(
            "feb",
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            PeriodStatus::Planned,
            Utc::now(),
        );
        store.insert_period(&p).unwrap();

        match r.before_operation(None) {
            HookOutcome::Swept(report) => assert_eq!(report.activated_count, 1),
            other => panic!("expected Swept, got {other:?}"),
        }
        assert_eq!(
            store.period(p.id).unwrap().unwrap().status,
            PeriodStatus::Active
        );
    }

    #[test]
    fn test_hook_with_ids_mixes_hits_and_misses() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let r = Reconciler::with_clock(store.clone(), fixed("2024-02-15T12:00:00Z"));
        let p = EvaluationPeriod::new(
            "feb",
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            PeriodStatus::Planned,
            Utc::now(),
        );
        store.insert_period(&p).unwrap();
        let ghost = uuid::Uuid::new_v4();

        match r.before_operation(Some(&[p.id, ghost])) {
            HookOutcome::Reconciled(targets) => {
                assert_eq!(targets.len(), 2);
                assert!(targets[0].outcome.as_ref().unwrap().updated());
                assert!(targets[1].error.is_some());
            }
            other => panic!("expected Reconciled, got {other:?}"),
        }
    }
}

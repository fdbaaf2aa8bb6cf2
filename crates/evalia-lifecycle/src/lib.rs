//! # Evalia Lifecycle
//!
//! The status lifecycle of evaluation periods: a small forward-only state
//! machine driven by wall-clock time.
//!
//! ## Design
//! - `derive_status` is pure — the evaluation instant is a parameter, never
//!   read ad hoc. The [`Reconciler`] injects its clock (defaulting to
//!   `Utc::now`), so tests run against a fixed instant.
//! - Transitions are applied only when present in the explicit table on
//!   `PeriodStatus` (`PLANNED → ACTIVE → FINISHED`; `CANCELLED` absorbing).
//!   A derived status the table does not allow is a no-op, so the engine
//!   never regresses a period, whatever the clock or the dates say.
//! - The pre-operation hook never propagates failures to the operation it
//!   guards: it logs, folds the error into its outcome value, and lets the
//!   caller proceed with possibly stale statuses.

pub mod hook;
pub mod reconciler;
pub mod report;
pub mod status;

pub use hook::{HookOutcome, HookTarget};
pub use reconciler::{Clock, LifecycleError, Reconciler};
pub use report::{InspectedPeriod, InspectionReport, ReconcileOutcome, SweepDetail, SweepReport};
pub use status::derive_status;

//! Pure status derivation.

use chrono::{DateTime, Utc};
use evalia_core::period::PeriodStatus;

/// Compute the status a period should have at `now`.
///
/// Priority order:
/// 1. `CANCELLED` stays `CANCELLED` (absorbing).
/// 2. `now` strictly past the end date → `FINISHED`.
/// 3. `now` inside the inclusive window → `ACTIVE`.
/// 4. Otherwise (before the window) → `PLANNED`.
///
/// Boundaries have date granularity: the period is `ACTIVE` through the
/// entire end date and becomes `FINISHED` only from the next day on.
///
/// Pure function — no I/O, deterministic for identical inputs. Whether the
/// derived status may actually be written is a separate question answered by
/// the transition table ([`PeriodStatus::can_advance_to`]).
pub fn derive_status(
    start_date: chrono::NaiveDate,
    end_date: chrono::NaiveDate,
    current: PeriodStatus,
    now: DateTime<Utc>,
) -> PeriodStatus {
    if current == PeriodStatus::Cancelled {
        return PeriodStatus::Cancelled;
    }
    let today = now.date_naive();
    if today > end_date {
        PeriodStatus::Finished
    } else if today >= start_date {
        PeriodStatus::Active
    } else {
        PeriodStatus::Planned
    }
}

//! API route handlers for the gateway.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use evalia_core::period::{Evaluation, EvaluationPeriod, PeriodStatus};
use evalia_lifecycle::{LifecycleError, ReconcileOutcome};
use evalia_store::PeriodStore;

use super::server::AppState;

/// Header carrying the caller's role, resolved by the upstream auth proxy.
pub const ROLE_HEADER: &str = "x-evalia-role";

/// Build a `{success: false, message}` failure envelope.
fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({"success": false, "message": message.into()})),
    )
        .into_response()
}

/// Role gate middleware — administrative routes require admin or manager.
pub async fn require_manager(req: axum::extract::Request, next: Next) -> Response {
    let role = req
        .headers()
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if role.eq_ignore_ascii_case("admin") || role.eq_ignore_ascii_case("manager") {
        return next.run(req).await;
    }
    failure(
        StatusCode::FORBIDDEN,
        "Access restricted to admin or manager roles",
    )
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "evalia-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReconcileQuery {
    pub period_id: Option<Uuid>,
    pub force: Option<bool>,
}

/// `POST /api/v1/periods/reconcile` — reconcile one period or run a sweep.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReconcileQuery>,
) -> Response {
    if query.force.unwrap_or(false) {
        // The transition table fully constrains writes, so force cannot
        // change the outcome; accepted for wire compatibility.
        tracing::debug!("Forced reconciliation requested");
    }

    match query.period_id {
        Some(id) => match state.reconciler.reconcile_one(id) {
            Ok(ReconcileOutcome::Transitioned {
                previous_status,
                new_status,
            }) => Json(json!({
                "success": true,
                "message": format!("Period transitioned {previous_status} -> {new_status}"),
                "period": {
                    "id": id,
                    "updated": true,
                    "previous_status": previous_status,
                    "new_status": new_status,
                },
            }))
            .into_response(),
            Ok(ReconcileOutcome::Unchanged { status }) => Json(json!({
                "success": true,
                "message": "Period status already current",
                "period": {
                    "id": id,
                    "updated": false,
                    "status": status,
                },
            }))
            .into_response(),
            Err(LifecycleError::NotFound(_)) => {
                failure(StatusCode::NOT_FOUND, format!("Period {id} not found"))
            }
            Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        None => match state.reconciler.reconcile_all() {
            Ok(report) => Json(json!({
                "success": true,
                "message": format!("Sweep applied {} transition(s)", report.updated_count),
                "statistics": {
                    "updated_count": report.updated_count,
                    "activated_count": report.activated_count,
                    "finished_count": report.finished_count,
                },
                "details": report.details,
            }))
            .into_response(),
            Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
    }
}

/// `GET /api/v1/periods/reconcile` — dry run, writes nothing.
pub async fn reconcile_dry_run(State(state): State<Arc<AppState>>) -> Response {
    match state.reconciler.inspect_pending() {
        Ok(report) => Json(json!({
            "success": true,
            "checked_at": report.checked_at,
            "summary": {
                "total": report.total(),
                "correct": report.correct.len(),
                "needing_update": report.needing_update.len(),
            },
            "periods_needing_update": report.needing_update,
            "periods_correct": report.correct,
        }))
        .into_response(),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /api/v1/periods` — list all periods.
pub async fn list_periods(State(state): State<Arc<AppState>>) -> Response {
    // Statuses must be current before they are shown; a hook failure must
    // not block the read.
    let _ = state.reconciler.before_operation(None);

    match state.store.list_periods() {
        Ok(periods) => Json(json!({"success": true, "periods": periods})).into_response(),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePeriodRequest {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_new_status")]
    pub status: PeriodStatus,
}

fn default_new_status() -> PeriodStatus {
    PeriodStatus::Planned
}

/// `POST /api/v1/periods` — create a period with a caller-supplied status.
pub async fn create_period(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePeriodRequest>,
) -> Response {
    // Overlap validation below depends on statuses being current.
    let _ = state.reconciler.before_operation(None);

    let name = req.name.trim();
    if name.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Period name is required");
    }
    if req.start_date > req.end_date {
        return failure(
            StatusCode::BAD_REQUEST,
            "start_date must not be after end_date",
        );
    }

    match state.store.period_by_name(name) {
        Ok(Some(_)) => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!("Period name '{name}' is already in use"),
            );
        }
        Ok(None) => {}
        Err(e) => return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }

    match state.store.overlapping_periods(req.start_date, req.end_date) {
        Ok(conflicts) if !conflicts.is_empty() => {
            let names: Vec<&str> = conflicts.iter().map(|p| p.name.as_str()).collect();
            return failure(
                StatusCode::BAD_REQUEST,
                format!("Date range overlaps existing period(s): {}", names.join(", ")),
            );
        }
        Ok(_) => {}
        Err(e) => return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }

    let period = EvaluationPeriod::new(
        name,
        req.start_date,
        req.end_date,
        req.status,
        state.reconciler.now(),
    );
    match state.store.insert_period(&period) {
        Ok(()) => {
            tracing::info!("📅 Period created: '{}' ({})", period.name, period.id);
            (
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "message": format!("Period '{}' created", period.name),
                    "period": period,
                })),
            )
                .into_response()
        }
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /api/v1/periods/{id}` — fetch one period.
pub async fn get_period(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    let _ = state.reconciler.before_operation(Some(&[id]));

    match state.store.period(id) {
        Ok(Some(period)) => Json(json!({"success": true, "period": period})).into_response(),
        Ok(None) => failure(StatusCode::NOT_FOUND, format!("Period {id} not found")),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordEvaluationRequest {
    pub employee: String,
    pub score: f64,
    #[serde(default)]
    pub comments: Option<String>,
}

/// `POST /api/v1/periods/{id}/evaluations` — record an evaluation against an
/// active period.
pub async fn record_evaluation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordEvaluationRequest>,
) -> Response {
    // The period may have entered its window without anyone reconciling it
    // yet — run the hook first so a due PLANNED period activates and the
    // write below sees the current status.
    let _ = state.reconciler.before_operation(Some(&[id]));

    let period = match state.store.period(id) {
        Ok(Some(period)) => period,
        Ok(None) => return failure(StatusCode::NOT_FOUND, format!("Period {id} not found")),
        Err(e) => return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    if period.status != PeriodStatus::Active {
        return failure(
            StatusCode::BAD_REQUEST,
            format!(
                "Evaluations can only be recorded against an ACTIVE period (status is {})",
                period.status
            ),
        );
    }
    if req.employee.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Employee is required");
    }
    if !(0.0..=10.0).contains(&req.score) {
        return failure(StatusCode::BAD_REQUEST, "Score must be between 0 and 10");
    }

    let evaluation = Evaluation::new(
        id,
        req.employee.trim(),
        req.score,
        req.comments,
        state.reconciler.now(),
    );
    match state.store.insert_evaluation(&evaluation) {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({"success": true, "evaluation": evaluation})),
        )
            .into_response(),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /api/v1/periods/{id}/evaluations` — list a period's evaluations.
pub async fn list_evaluations(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.store.period(id) {
        Ok(Some(_)) => {}
        Ok(None) => return failure(StatusCode::NOT_FOUND, format!("Period {id} not found")),
        Err(e) => return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }

    match state.store.evaluations_for_period(id) {
        Ok(evaluations) => {
            Json(json!({"success": true, "evaluations": evaluations})).into_response()
        }
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

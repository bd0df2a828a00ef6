use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use rrgt_core::provision::PlanFilter;
use rrgt_core::Identity;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct PlanListQuery {
    pub project_id: Option<Uuid>,
    pub objective_id: Option<Uuid>,
}

/// GET /api/rrgt/mine — list the caller's plans, provisioning any that are
/// missing for newly assigned tasks.
pub async fn list_my_plans(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PlanListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = PlanFilter {
        project_id: query.project_id,
        objective_id: query.objective_id,
    };
    let plans = rrgt_core::provision::reconcile_plans(&app.pool, &identity, &filter).await?;
    let total = plans.len();
    Ok(Json(serde_json::json!({ "plans": plans, "total": total })))
}

/// GET /api/rrgt/:team_member_id — manager god-view of another member's
/// plans and dial. Role-gated in the core.
pub async fn get_member_plans(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(team_member_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let view = rrgt_core::access::god_view(&app.pool, &identity, team_member_id).await?;
    let total = view.plans.len();
    Ok(Json(serde_json::json!({
        "team_member_id": view.team_member_id,
        "owner_name": view.owner_name,
        "plans": view.plans,
        "total": total,
        "dial_state": view.dial_state,
    })))
}

#[derive(serde::Deserialize)]
pub struct MoveRabbitBody {
    pub column_index: i32,
}

/// PUT /api/rrgt/plans/:plan_id/rabbit — move the rabbit.
pub async fn move_rabbit(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<MoveRabbitBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rabbit =
        rrgt_core::plans::move_rabbit(&app.pool, &identity, plan_id, body.column_index).await?;
    Ok(Json(serde_json::json!({ "rabbit": rabbit })))
}

#[derive(serde::Deserialize)]
pub struct UpsertSubtaskBody {
    pub column_index: i32,
    pub text: String,
}

/// PUT /api/rrgt/plans/:plan_id/subtasks — write subtask text into a column.
pub async fn upsert_subtask(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<UpsertSubtaskBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let subtask = rrgt_core::plans::upsert_subtask(
        &app.pool,
        &identity,
        plan_id,
        body.column_index,
        body.text,
    )
    .await?;
    Ok(Json(serde_json::json!({ "subtask": subtask })))
}

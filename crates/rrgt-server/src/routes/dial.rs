use axum::extract::State;
use axum::{Extension, Json};
use rrgt_core::dial::DialPatch;
use rrgt_core::Identity;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/dial/mine — the caller's dial, or null if never written.
pub async fn get_my_dial(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dial_state = rrgt_core::dial::read_dial(&app.pool, &identity).await?;
    Ok(Json(serde_json::json!({ "dial_state": dial_state })))
}

/// PUT /api/dial/mine — create or partially update the caller's dial.
/// Omitted fields are left unchanged; explicit nulls clear.
pub async fn put_my_dial(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(patch): Json<DialPatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dial_state = rrgt_core::dial::write_dial(&app.pool, &identity, &patch).await?;
    Ok(Json(serde_json::json!({ "dial_state": dial_state })))
}

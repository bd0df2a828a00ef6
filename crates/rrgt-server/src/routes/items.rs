use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rrgt_core::items::NewItem;
use rrgt_core::Identity;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct CreateItemBody {
    pub title: String,
    #[serde(default)]
    pub column_index: i32,
}

/// POST /api/tasks/:task_id/items — create an item on an assigned task.
pub async fn create_item(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<CreateItemBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let item = rrgt_core::items::create_item(
        &app.pool,
        &identity,
        task_id,
        NewItem {
            title: body.title,
            column_index: body.column_index,
        },
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "item": item })),
    ))
}

#[derive(serde::Deserialize)]
pub struct UpdateItemBody {
    pub title: String,
}

/// PUT /api/items/:item_id — retitle an item (owner only).
pub async fn update_item(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(item_id): Path<Uuid>,
    Json(body): Json<UpdateItemBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let item = rrgt_core::items::update_item(&app.pool, &identity, item_id, body.title).await?;
    Ok(Json(serde_json::json!({ "item": item })))
}

/// DELETE /api/items/:item_id — delete an item (owner only).
pub async fn delete_item(
    State(app): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    rrgt_core::items::delete_item(&app.pool, &identity, item_id).await?;
    Ok(Json(serde_json::json!({ "item_id": item_id })))
}

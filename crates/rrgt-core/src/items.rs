//! Free-floating RRGT items: per-task notes owned by the member that
//! created them. Creation requires assignment to the task; updates and
//! deletes are owner-only.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, RrgtError};
use crate::identity::Identity;
use crate::types::Item;

#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub column_index: i32,
}

async fn item_by_id(pool: &PgPool, item_id: Uuid) -> Result<Item> {
    let item: Option<Item> = sqlx::query_as(
        r#"
        SELECT id, task_id, team_member_id, column_index, title, created_at, updated_at
        FROM rrgt_items
        WHERE id = $1
        "#,
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?;
    item.ok_or(RrgtError::ItemNotFound(item_id))
}

/// Create an item on a task the caller is assigned to.
pub async fn create_item(
    pool: &PgPool,
    identity: &Identity,
    task_id: Uuid,
    new_item: NewItem,
) -> Result<Item> {
    if new_item.title.trim().is_empty() {
        return Err(RrgtError::MissingField("title"));
    }
    if new_item.column_index < 0 {
        return Err(RrgtError::NegativeColumnIndex);
    }

    let task_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?;
    if task_exists.is_none() {
        return Err(RrgtError::TaskNotFound(task_id));
    }

    let assigned: Option<(Uuid,)> = sqlx::query_as(
        "SELECT task_id FROM task_assignments WHERE task_id = $1 AND team_member_id = $2",
    )
    .bind(task_id)
    .bind(identity.team_member_id)
    .fetch_optional(pool)
    .await?;
    if assigned.is_none() {
        return Err(RrgtError::NotAssignedToTask);
    }

    let item: Item = sqlx::query_as(
        r#"
        INSERT INTO rrgt_items (task_id, team_member_id, column_index, title)
        VALUES ($1, $2, $3, $4)
        RETURNING id, task_id, team_member_id, column_index, title, created_at, updated_at
        "#,
    )
    .bind(task_id)
    .bind(identity.team_member_id)
    .bind(new_item.column_index)
    .bind(new_item.title)
    .fetch_one(pool)
    .await?;
    Ok(item)
}

/// Retitle one of the caller's own items.
pub async fn update_item(
    pool: &PgPool,
    identity: &Identity,
    item_id: Uuid,
    title: String,
) -> Result<Item> {
    if title.trim().is_empty() {
        return Err(RrgtError::MissingField("title"));
    }

    let item = item_by_id(pool, item_id).await?;
    if item.team_member_id != identity.team_member_id {
        return Err(RrgtError::NotItemOwner {
            action: "update",
            owner_id: item.team_member_id,
        });
    }

    let item: Item = sqlx::query_as(
        r#"
        UPDATE rrgt_items
        SET title = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, task_id, team_member_id, column_index, title, created_at, updated_at
        "#,
    )
    .bind(item_id)
    .bind(title)
    .fetch_one(pool)
    .await?;
    Ok(item)
}

/// Delete one of the caller's own items.
pub async fn delete_item(pool: &PgPool, identity: &Identity, item_id: Uuid) -> Result<()> {
    let item = item_by_id(pool, item_id).await?;
    if item.team_member_id != identity.team_member_id {
        return Err(RrgtError::NotItemOwner {
            action: "delete",
            owner_id: item.team_member_id,
        });
    }

    sqlx::query("DELETE FROM rrgt_items WHERE id = $1")
        .bind(item_id)
        .execute(pool)
        .await?;
    Ok(())
}

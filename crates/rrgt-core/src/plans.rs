//! Mutations on a single plan: moving the rabbit and writing subtask text.
//!
//! Both resolve the plan scoped to the caller, so another member's plan id
//! behaves exactly like a missing one.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, RrgtError};
use crate::identity::Identity;
use crate::types::{Plan, Rabbit, Subtask};

/// `column_index` must land inside the plan's `0..=max_column_index` range.
pub fn check_column_index(index: i32, max: i32) -> Result<()> {
    if index < 0 || index > max {
        return Err(RrgtError::ColumnOutOfRange { index, max });
    }
    Ok(())
}

async fn plan_for_member(pool: &PgPool, plan_id: Uuid, team_member_id: Uuid) -> Result<Plan> {
    let plan: Option<Plan> = sqlx::query_as(
        r#"
        SELECT id, task_id, team_member_id, project_id, objective_id, max_column_index,
               created_at, updated_at
        FROM rrgt_plans
        WHERE id = $1 AND team_member_id = $2
        "#,
    )
    .bind(plan_id)
    .bind(team_member_id)
    .fetch_optional(pool)
    .await?;
    plan.ok_or(RrgtError::PlanNotFound(plan_id))
}

/// Move the rabbit on one of the caller's plans. The stored position is
/// untouched when the target column is out of range.
pub async fn move_rabbit(
    pool: &PgPool,
    identity: &Identity,
    plan_id: Uuid,
    column_index: i32,
) -> Result<Rabbit> {
    let plan = plan_for_member(pool, plan_id, identity.team_member_id).await?;
    check_column_index(column_index, plan.max_column_index)?;

    let rabbit: Rabbit = sqlx::query_as(
        r#"
        INSERT INTO rrgt_rabbits (plan_id, current_column_index)
        VALUES ($1, $2)
        ON CONFLICT (plan_id) DO UPDATE
            SET current_column_index = EXCLUDED.current_column_index,
                updated_at = now()
        RETURNING plan_id, current_column_index, updated_at
        "#,
    )
    .bind(plan_id)
    .bind(column_index)
    .fetch_one(pool)
    .await?;
    Ok(rabbit)
}

/// Write subtask text into one column of one of the caller's plans.
/// Repeated writes to the same (plan, column) land on the same row.
pub async fn upsert_subtask(
    pool: &PgPool,
    identity: &Identity,
    plan_id: Uuid,
    column_index: i32,
    text: String,
) -> Result<Subtask> {
    let plan = plan_for_member(pool, plan_id, identity.team_member_id).await?;
    check_column_index(column_index, plan.max_column_index)?;

    let subtask: Subtask = sqlx::query_as(
        r#"
        INSERT INTO rrgt_subtasks (plan_id, column_index, text)
        VALUES ($1, $2, $3)
        ON CONFLICT (plan_id, column_index) DO UPDATE
            SET text = EXCLUDED.text,
                updated_at = now()
        RETURNING id, plan_id, column_index, text, created_at, updated_at
        "#,
    )
    .bind(plan_id)
    .bind(column_index)
    .bind(text)
    .fetch_one(pool)
    .await?;
    Ok(subtask)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_bounds_are_inclusive() {
        assert!(check_column_index(0, 6).is_ok());
        assert!(check_column_index(6, 6).is_ok());
        assert!(check_column_index(3, 6).is_ok());
    }

    #[test]
    fn column_past_max_is_rejected() {
        let err = check_column_index(7, 6).unwrap_err();
        match err {
            RrgtError::ColumnOutOfRange { index, max } => {
                assert_eq!(index, 7);
                assert_eq!(max, 6);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_column_is_rejected() {
        assert!(check_column_index(-1, 6).is_err());
    }
}

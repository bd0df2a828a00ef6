//! Lazy, idempotent provisioning of plans and their default rabbit/subtask
//! rows, plus the enrichment join that produces the dashboard shape.
//!
//! Provisioning is reconciliation: compute the set of plans that should
//! exist for a member (one per assigned, filtered task), insert the missing
//! ones in three batch statements inside one transaction, and re-read. The
//! plan insert lands on the (task_id, team_member_id) uniqueness with
//! ON CONFLICT DO NOTHING, so losing a provisioning race to a concurrent
//! request is a no-op rather than a failure.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::Result;
use crate::identity::Identity;
use crate::types::{EnrichedPlan, ObjectiveSummary, Rabbit, Subtask, TaskSummary};

/// Column bound a freshly provisioned plan starts with.
pub const DEFAULT_MAX_COLUMN_INDEX: i32 = 6;

/// Working columns seeded with empty subtasks at provisioning time.
/// Column 0 ("Start") is deliberately left unseeded.
const SEEDED_COLUMNS: std::ops::RangeInclusive<i32> = 1..=5;

/// Optional project/objective narrowing for a reconcile pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanFilter {
    pub project_id: Option<Uuid>,
    pub objective_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Internal rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    objective_id: Uuid,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ObjectiveRow {
    id: Uuid,
    project_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StagedPlan {
    task_id: Uuid,
    project_id: Uuid,
    objective_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct PlanJoinRow {
    id: Uuid,
    task_id: Uuid,
    team_member_id: Uuid,
    project_id: Uuid,
    objective_id: Uuid,
    max_column_index: i32,
    task_objective_id: Uuid,
    task_title: String,
    task_status: String,
    task_priority: i32,
    task_due_date: Option<DateTime<Utc>>,
    objective_project_id: Uuid,
    objective_name: String,
    rabbit_column_index: Option<i32>,
    rabbit_updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Ensure every task assigned to the caller (narrowed by `filter`) has a
/// plan, rabbit, and default subtask set, then return the enriched plans.
///
/// A member with no assignments, or a filter matching nothing, yields an
/// empty list without touching the write path.
pub async fn reconcile_plans(
    pool: &PgPool,
    identity: &Identity,
    filter: &PlanFilter,
) -> Result<Vec<EnrichedPlan>> {
    let member_id = identity.team_member_id;

    let assigned: Vec<(Uuid,)> =
        sqlx::query_as("SELECT task_id FROM task_assignments WHERE team_member_id = $1")
            .bind(member_id)
            .fetch_all(pool)
            .await?;
    let assigned: Vec<Uuid> = assigned.into_iter().map(|(id,)| id).collect();
    if assigned.is_empty() {
        return Ok(Vec::new());
    }

    let tasks: Vec<TaskRow> =
        sqlx::query_as("SELECT id, objective_id FROM tasks WHERE id = ANY($1)")
            .bind(&assigned)
            .fetch_all(pool)
            .await?;

    let objective_ids: Vec<Uuid> = tasks.iter().map(|t| t.objective_id).collect();
    let objectives: Vec<ObjectiveRow> =
        sqlx::query_as("SELECT id, project_id FROM objectives WHERE id = ANY($1)")
            .bind(&objective_ids)
            .fetch_all(pool)
            .await?;
    let objectives_by_id: HashMap<Uuid, ObjectiveRow> =
        objectives.into_iter().map(|o| (o.id, o)).collect();

    let filtered = apply_filters(tasks, &objectives_by_id, filter);
    if filtered.is_empty() {
        return Ok(Vec::new());
    }
    let filtered_task_ids: Vec<Uuid> = filtered.iter().map(|t| t.id).collect();

    let existing: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT task_id FROM rrgt_plans WHERE team_member_id = $1 AND task_id = ANY($2)",
    )
    .bind(member_id)
    .bind(&filtered_task_ids)
    .fetch_all(pool)
    .await?;
    let existing: HashSet<Uuid> = existing.into_iter().map(|(id,)| id).collect();

    let staged = stage_missing_plans(&filtered, &objectives_by_id, &existing);
    if !staged.is_empty() {
        insert_staged(pool, member_id, &staged).await?;
    }

    enrich_plans(pool, member_id, &filtered_task_ids).await
}

/// Insert the staged plans plus their default rabbits and subtasks: three
/// batch statements in one transaction, so a mid-flight failure leaves no
/// orphan rabbit or subtask behind.
async fn insert_staged(pool: &PgPool, member_id: Uuid, staged: &[StagedPlan]) -> Result<()> {
    let task_ids: Vec<Uuid> = staged.iter().map(|s| s.task_id).collect();
    let project_ids: Vec<Uuid> = staged.iter().map(|s| s.project_id).collect();
    let objective_ids: Vec<Uuid> = staged.iter().map(|s| s.objective_id).collect();

    let mut tx = pool.begin().await?;

    let inserted: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO rrgt_plans (task_id, team_member_id, project_id, objective_id, max_column_index)
        SELECT t.task_id, $4, t.project_id, t.objective_id, $5
        FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[]) AS t(task_id, project_id, objective_id)
        ON CONFLICT (task_id, team_member_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&task_ids)
    .bind(&project_ids)
    .bind(&objective_ids)
    .bind(member_id)
    .bind(DEFAULT_MAX_COLUMN_INDEX)
    .fetch_all(&mut *tx)
    .await?;
    let new_plan_ids: Vec<Uuid> = inserted.into_iter().map(|(id,)| id).collect();

    if !new_plan_ids.is_empty() {
        sqlx::query(
            "INSERT INTO rrgt_rabbits (plan_id) SELECT plan_id FROM UNNEST($1::uuid[]) AS t(plan_id)",
        )
        .bind(&new_plan_ids)
        .execute(&mut *tx)
        .await?;

        let (subtask_plan_ids, subtask_columns) = seeded_subtask_rows(&new_plan_ids);
        sqlx::query(
            r#"
            INSERT INTO rrgt_subtasks (plan_id, column_index, text)
            SELECT t.plan_id, t.column_index, ''
            FROM UNNEST($1::uuid[], $2::int4[]) AS t(plan_id, column_index)
            "#,
        )
        .bind(&subtask_plan_ids)
        .bind(&subtask_columns)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Join a member's plans (restricted to `task_ids`) to task, objective,
/// rabbit, and ordered subtasks.
///
/// Task and objective joins are inner: a plan whose task or objective is
/// gone is excluded. The rabbit join is outer: a missing rabbit renders as
/// null.
pub async fn enrich_plans(
    pool: &PgPool,
    team_member_id: Uuid,
    task_ids: &[Uuid],
) -> Result<Vec<EnrichedPlan>> {
    if task_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<PlanJoinRow> = sqlx::query_as(
        r#"
        SELECT p.id, p.task_id, p.team_member_id, p.project_id, p.objective_id, p.max_column_index,
               t.objective_id AS task_objective_id, t.title AS task_title,
               t.status AS task_status, t.priority AS task_priority, t.due_date AS task_due_date,
               o.project_id AS objective_project_id, o.name AS objective_name,
               r.current_column_index AS rabbit_column_index, r.updated_at AS rabbit_updated_at
        FROM rrgt_plans p
        JOIN tasks t ON t.id = p.task_id
        JOIN objectives o ON o.id = p.objective_id
        LEFT JOIN rrgt_rabbits r ON r.plan_id = p.id
        WHERE p.team_member_id = $1 AND p.task_id = ANY($2)
        "#,
    )
    .bind(team_member_id)
    .bind(task_ids)
    .fetch_all(pool)
    .await?;

    let plan_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let subtask_rows: Vec<Subtask> = sqlx::query_as(
        r#"
        SELECT id, plan_id, column_index, text, created_at, updated_at
        FROM rrgt_subtasks
        WHERE plan_id = ANY($1)
        "#,
    )
    .bind(&plan_ids)
    .fetch_all(pool)
    .await?;
    let mut subtasks_by_plan = group_subtasks(subtask_rows);

    Ok(rows
        .into_iter()
        .map(|row| {
            let subtasks = subtasks_by_plan.remove(&row.id).unwrap_or_default();
            let rabbit = row
                .rabbit_column_index
                .zip(row.rabbit_updated_at)
                .map(|(current_column_index, updated_at)| Rabbit {
                    plan_id: row.id,
                    current_column_index,
                    updated_at,
                });
            EnrichedPlan {
                id: row.id,
                task_id: row.task_id,
                team_member_id: row.team_member_id,
                project_id: row.project_id,
                objective_id: row.objective_id,
                max_column_index: row.max_column_index,
                task: TaskSummary {
                    id: row.task_id,
                    objective_id: row.task_objective_id,
                    title: row.task_title,
                    status: row.task_status,
                    priority: row.task_priority,
                    due_date: row.task_due_date,
                },
                objective: ObjectiveSummary {
                    id: row.objective_id,
                    project_id: row.objective_project_id,
                    name: row.objective_name,
                },
                rabbit,
                subtasks,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Keep tasks whose objective resolves and survives the project/objective
/// filters. Tasks pointing at a missing objective are dropped, not errors.
fn apply_filters(
    tasks: Vec<TaskRow>,
    objectives_by_id: &HashMap<Uuid, ObjectiveRow>,
    filter: &PlanFilter,
) -> Vec<TaskRow> {
    tasks
        .into_iter()
        .filter(|task| {
            let Some(objective) = objectives_by_id.get(&task.objective_id) else {
                return false;
            };
            if let Some(project_id) = filter.project_id {
                if objective.project_id != project_id {
                    return false;
                }
            }
            if let Some(objective_id) = filter.objective_id {
                if objective.id != objective_id {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Stage one plan insert per filtered task that has no plan yet, carrying
/// the provisioning-time project/objective snapshot.
fn stage_missing_plans(
    filtered: &[TaskRow],
    objectives_by_id: &HashMap<Uuid, ObjectiveRow>,
    existing_task_ids: &HashSet<Uuid>,
) -> Vec<StagedPlan> {
    filtered
        .iter()
        .filter(|task| !existing_task_ids.contains(&task.id))
        .filter_map(|task| {
            let objective = objectives_by_id.get(&task.objective_id)?;
            Some(StagedPlan {
                task_id: task.id,
                project_id: objective.project_id,
                objective_id: objective.id,
            })
        })
        .collect()
}

/// Flatten plan ids into parallel (plan_id, column_index) arrays covering
/// the seeded working columns.
fn seeded_subtask_rows(plan_ids: &[Uuid]) -> (Vec<Uuid>, Vec<i32>) {
    let mut out_plans = Vec::with_capacity(plan_ids.len() * SEEDED_COLUMNS.clone().count());
    let mut out_columns = Vec::with_capacity(out_plans.capacity());
    for &plan_id in plan_ids {
        for column in SEEDED_COLUMNS.clone() {
            out_plans.push(plan_id);
            out_columns.push(column);
        }
    }
    (out_plans, out_columns)
}

/// Group subtasks by plan, ordered by column index within each plan.
fn group_subtasks(rows: Vec<Subtask>) -> HashMap<Uuid, Vec<Subtask>> {
    let mut grouped: HashMap<Uuid, Vec<Subtask>> = HashMap::new();
    for subtask in rows {
        grouped.entry(subtask.plan_id).or_default().push(subtask);
    }
    for subtasks in grouped.values_mut() {
        subtasks.sort_by_key(|s| s.column_index);
    }
    grouped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(objective_id: Uuid) -> TaskRow {
        TaskRow {
            id: Uuid::new_v4(),
            objective_id,
        }
    }

    fn objective(project_id: Uuid) -> ObjectiveRow {
        ObjectiveRow {
            id: Uuid::new_v4(),
            project_id,
        }
    }

    fn subtask(plan_id: Uuid, column_index: i32) -> Subtask {
        let now = Utc::now();
        Subtask {
            id: Uuid::new_v4(),
            plan_id,
            column_index,
            text: Some(String::new()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn filters_drop_orphaned_tasks() {
        let project = Uuid::new_v4();
        let obj = objective(project);
        let known = task(obj.id);
        let orphan = task(Uuid::new_v4());
        let objectives = HashMap::from([(obj.id, obj)]);

        let kept = apply_filters(
            vec![known.clone(), orphan],
            &objectives,
            &PlanFilter::default(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, known.id);
    }

    #[test]
    fn project_filter_narrows_tasks() {
        let obj_a = objective(Uuid::new_v4());
        let obj_b = objective(Uuid::new_v4());
        let in_project = task(obj_a.id);
        let other = task(obj_b.id);
        let filter = PlanFilter {
            project_id: Some(obj_a.project_id),
            objective_id: None,
        };
        let objectives = HashMap::from([(obj_a.id, obj_a.clone()), (obj_b.id, obj_b)]);

        let kept = apply_filters(vec![in_project.clone(), other], &objectives, &filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, in_project.id);
    }

    #[test]
    fn objective_filter_narrows_tasks() {
        let project = Uuid::new_v4();
        let obj_a = objective(project);
        let obj_b = objective(project);
        let wanted = task(obj_a.id);
        let other = task(obj_b.id);
        let filter = PlanFilter {
            project_id: None,
            objective_id: Some(obj_a.id),
        };
        let objectives = HashMap::from([(obj_a.id, obj_a), (obj_b.id, obj_b)]);

        let kept = apply_filters(vec![wanted.clone(), other], &objectives, &filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, wanted.id);
    }

    #[test]
    fn staging_skips_tasks_with_plans() {
        let obj = objective(Uuid::new_v4());
        let provisioned = task(obj.id);
        let missing = task(obj.id);
        let objectives = HashMap::from([(obj.id, obj.clone())]);
        let existing = HashSet::from([provisioned.id]);

        let staged = stage_missing_plans(
            &[provisioned, missing.clone()],
            &objectives,
            &existing,
        );
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].task_id, missing.id);
        assert_eq!(staged[0].project_id, obj.project_id);
        assert_eq!(staged[0].objective_id, obj.id);
    }

    #[test]
    fn staging_everything_existing_is_a_noop() {
        let obj = objective(Uuid::new_v4());
        let t1 = task(obj.id);
        let t2 = task(obj.id);
        let objectives = HashMap::from([(obj.id, obj)]);
        let existing = HashSet::from([t1.id, t2.id]);

        assert!(stage_missing_plans(&[t1, t2], &objectives, &existing).is_empty());
    }

    #[test]
    fn seeded_rows_cover_columns_one_through_five() {
        let plans = vec![Uuid::new_v4(), Uuid::new_v4()];
        let (plan_ids, columns) = seeded_subtask_rows(&plans);
        assert_eq!(plan_ids.len(), 10);
        assert_eq!(columns.len(), 10);
        assert_eq!(&columns[..5], &[1, 2, 3, 4, 5]);
        assert!(plan_ids[..5].iter().all(|id| *id == plans[0]));
        assert!(plan_ids[5..].iter().all(|id| *id == plans[1]));
    }

    #[test]
    fn grouped_subtasks_are_ordered_by_column() {
        let plan = Uuid::new_v4();
        let rows = vec![subtask(plan, 4), subtask(plan, 1), subtask(plan, 3)];
        let grouped = group_subtasks(rows);
        let columns: Vec<i32> = grouped[&plan].iter().map(|s| s.column_index).collect();
        assert_eq!(columns, vec![1, 3, 4]);
    }
}

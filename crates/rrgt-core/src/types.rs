use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Which side of the Dial currently has primary focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Left => "left",
            Slot::Right => "right",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Slot {
    type Err = crate::error::RrgtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Slot::Left),
            "right" => Ok(Slot::Right),
            _ => Err(crate::error::RrgtError::InvalidSlot(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan / Subtask / Rabbit rows
// ---------------------------------------------------------------------------

/// One team member's planning surface for one task.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub task_id: Uuid,
    pub team_member_id: Uuid,
    pub project_id: Uuid,
    pub objective_id: Uuid,
    pub max_column_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Free-text note anchored to one column of one plan.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subtask {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub column_index: i32,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single current-position marker for a plan.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Rabbit {
    pub plan_id: Uuid,
    pub current_column_index: i32,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Dial
// ---------------------------------------------------------------------------

/// The stored two-slot comparison record, one per team member.
///
/// `selected_slot` is kept as raw text at this layer; [`Slot`] validation
/// happens on write.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DialState {
    pub team_member_id: Uuid,
    pub left_plan_id: Option<Uuid>,
    pub left_column_index: Option<i32>,
    pub left_text: Option<String>,
    pub right_plan_id: Option<Uuid>,
    pub right_column_index: Option<i32>,
    pub selected_slot: Option<String>,
    pub is_left_private: bool,
    pub is_right_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DialState {
    /// The merge base for a member that has no dial row yet.
    pub fn empty(team_member_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            team_member_id,
            left_plan_id: None,
            left_column_index: None,
            left_text: None,
            right_plan_id: None,
            right_column_index: None,
            selected_slot: None,
            is_left_private: false,
            is_right_private: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The dial as the dashboard consumes it: the stored record plus task titles
/// resolved through each slot's plan. A null or dangling plan reference
/// renders as a null title, never an error.
#[derive(Debug, Clone, Serialize)]
pub struct DialView {
    pub team_member_id: Uuid,
    pub left_plan_id: Option<Uuid>,
    pub left_column_index: Option<i32>,
    pub left_text: Option<String>,
    pub right_plan_id: Option<Uuid>,
    pub right_column_index: Option<i32>,
    pub selected_slot: Option<String>,
    pub is_left_private: bool,
    pub is_right_private: bool,
    pub left_task_title: Option<String>,
    pub right_task_title: Option<String>,
}

impl DialView {
    pub fn from_state(
        state: DialState,
        left_task_title: Option<String>,
        right_task_title: Option<String>,
    ) -> Self {
        Self {
            team_member_id: state.team_member_id,
            left_plan_id: state.left_plan_id,
            left_column_index: state.left_column_index,
            left_text: state.left_text,
            right_plan_id: state.right_plan_id,
            right_column_index: state.right_column_index,
            selected_slot: state.selected_slot,
            is_left_private: state.is_left_private,
            is_right_private: state.is_right_private,
            left_task_title,
            right_task_title,
        }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Free-floating per-task note, owned by the member that created it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Item {
    pub id: Uuid,
    pub task_id: Uuid,
    pub team_member_id: Uuid,
    pub column_index: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Enriched plan (dashboard shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub objective_id: Uuid,
    pub title: String,
    pub status: String,
    pub priority: i32,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveSummary {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
}

/// Plan joined to its task, objective, rabbit, and ordered subtasks.
///
/// The rabbit may be briefly absent mid-provisioning and renders as null.
/// Subtasks are strictly ordered by `column_index`; the ordering of the
/// top-level plan list is unspecified.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedPlan {
    pub id: Uuid,
    pub task_id: Uuid,
    pub team_member_id: Uuid,
    pub project_id: Uuid,
    pub objective_id: Uuid,
    pub max_column_index: i32,
    pub task: TaskSummary,
    pub objective: ObjectiveSummary,
    pub rabbit: Option<Rabbit>,
    pub subtasks: Vec<Subtask>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

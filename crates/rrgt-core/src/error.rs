use thiserror::Error;
use uuid::Uuid;

use crate::types::Slot;

#[derive(Debug, Error)]
pub enum RrgtError {
    #[error("missing team member context")]
    MissingTeamMemberContext,

    #[error("only Account Owner and Account Manager can view team member RRGT data")]
    NotAccountAdmin { current_role: String },

    #[error("you can only create items for tasks assigned to you")]
    NotAssignedToTask,

    #[error("you can only {action} your own items")]
    NotItemOwner { action: &'static str, owner_id: Uuid },

    #[error("{side} plan does not belong to you")]
    DialPlanNotOwned { side: Slot },

    #[error("column_index {index} is out of range for this plan (0..={max})")]
    ColumnOutOfRange { index: i32, max: i32 },

    #[error("column_index must not be negative")]
    NegativeColumnIndex,

    #[error("invalid dial slot '{0}': expected 'left' or 'right'")]
    InvalidSlot(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("{0} must not be empty")]
    MissingField(&'static str),

    #[error("plan not found: {0}")]
    PlanNotFound(Uuid),

    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("item not found: {0}")]
    ItemNotFound(Uuid),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, RrgtError>;

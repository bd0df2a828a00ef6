//! The manager god-view: elevated-role read access to another member's
//! plans and dial.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dial;
use crate::error::{Result, RrgtError};
use crate::identity::Identity;
use crate::provision;
use crate::types::{DialView, EnrichedPlan};

/// Display name used when the target member record cannot be resolved.
/// A missing member still returns a named, empty result.
pub const UNKNOWN_OWNER: &str = "Unknown";

#[derive(Debug, Serialize)]
pub struct GodView {
    pub team_member_id: Uuid,
    pub owner_name: String,
    pub plans: Vec<EnrichedPlan>,
    pub dial_state: Option<DialView>,
}

/// Read another member's plans and dial. Only Account Owner and Account
/// Manager pass the gate; everyone else gets a Forbidden carrying their
/// actual role. Never provisions on the target's behalf; it enriches
/// whatever plans already exist. Private dial sides are redacted.
pub async fn god_view(pool: &PgPool, identity: &Identity, target: Uuid) -> Result<GodView> {
    if !identity.role.is_account_admin() {
        return Err(RrgtError::NotAccountAdmin {
            current_role: identity.role.as_str().to_string(),
        });
    }

    // Resolved independently of the plan path so a member with zero plans
    // still comes back named.
    let owner_name: Option<(String,)> =
        sqlx::query_as("SELECT name FROM team_members WHERE id = $1")
            .bind(target)
            .fetch_optional(pool)
            .await?;
    let owner_name = owner_name
        .map(|(name,)| name)
        .unwrap_or_else(|| UNKNOWN_OWNER.to_string());

    let assigned: Vec<(Uuid,)> =
        sqlx::query_as("SELECT task_id FROM task_assignments WHERE team_member_id = $1")
            .bind(target)
            .fetch_all(pool)
            .await?;
    let task_ids: Vec<Uuid> = assigned.into_iter().map(|(id,)| id).collect();

    let plans = provision::enrich_plans(pool, target, &task_ids).await?;
    let dial_state = dial::read_dial_for(pool, target)
        .await?
        .map(dial::redact_private);

    Ok(GodView {
        team_member_id: target,
        owner_name,
        plans,
        dial_state,
    })
}

//! The Dial: one two-slot comparison record per team member.
//!
//! Writes are partial merges: a field absent from the patch is left alone,
//! an explicit null clears it. Plan references are validated against the
//! caller's own plans before anything is written; reads tolerate references
//! whose plan has since been deleted.

use serde::{Deserialize, Deserializer};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Result, RrgtError};
use crate::identity::Identity;
use crate::types::{DialState, DialView, Slot};

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Distinguishes "field absent" (outer `None`) from "field explicitly null"
/// (inner `None`) for nullable columns.
fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Partial update for a dial state. Every field is optional; nullable
/// columns are double-wrapped so an explicit null can clear them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DialPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub left_plan_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub left_column_index: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub left_text: Option<Option<String>>,
    pub is_left_private: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub right_plan_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub right_column_index: Option<Option<i32>>,
    // Accepted for wire compatibility; there is no right_text column.
    #[serde(default, deserialize_with = "double_option")]
    pub right_text: Option<Option<String>>,
    pub is_right_private: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub selected_slot: Option<Option<String>>,
}

impl DialPatch {
    /// Reject a `selected_slot` value that names neither side.
    fn validate(&self) -> Result<()> {
        if let Some(Some(slot)) = &self.selected_slot {
            Slot::from_str(slot)?;
        }
        Ok(())
    }
}

/// Apply a patch over an existing state (or the empty merge base), field by
/// field. Absent fields keep their current value.
fn merge_patch(mut state: DialState, patch: &DialPatch) -> DialState {
    if let Some(v) = patch.left_plan_id {
        state.left_plan_id = v;
    }
    if let Some(v) = patch.left_column_index {
        state.left_column_index = v;
    }
    if let Some(v) = &patch.left_text {
        state.left_text = v.clone();
    }
    if let Some(v) = patch.is_left_private {
        state.is_left_private = v;
    }
    if let Some(v) = patch.right_plan_id {
        state.right_plan_id = v;
    }
    if let Some(v) = patch.right_column_index {
        state.right_column_index = v;
    }
    if let Some(v) = patch.is_right_private {
        state.is_right_private = v;
    }
    if let Some(v) = &patch.selected_slot {
        state.selected_slot = v.clone();
    }
    state
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// The caller's dial, or `None` if they have never written one.
pub async fn read_dial(pool: &PgPool, identity: &Identity) -> Result<Option<DialView>> {
    read_dial_for(pool, identity.team_member_id).await
}

/// Dial lookup by member id; the god-view path reads other members through
/// this and applies redaction on top.
pub(crate) async fn read_dial_for(pool: &PgPool, team_member_id: Uuid) -> Result<Option<DialView>> {
    let state = fetch_state(pool, team_member_id).await?;
    match state {
        None => Ok(None),
        Some(state) => {
            let (left_title, right_title) = resolve_titles(pool, &state).await?;
            Ok(Some(DialView::from_state(state, left_title, right_title)))
        }
    }
}

async fn fetch_state(pool: &PgPool, team_member_id: Uuid) -> Result<Option<DialState>> {
    let state: Option<DialState> = sqlx::query_as(
        r#"
        SELECT team_member_id, left_plan_id, left_column_index, left_text,
               right_plan_id, right_column_index, selected_slot,
               is_left_private, is_right_private, created_at, updated_at
        FROM dial_states
        WHERE team_member_id = $1
        "#,
    )
    .bind(team_member_id)
    .fetch_optional(pool)
    .await?;
    Ok(state)
}

/// Resolve each slot's task title through its plan. A null plan reference,
/// or one whose plan/task has been deleted, yields a null title.
async fn resolve_titles(
    pool: &PgPool,
    state: &DialState,
) -> Result<(Option<String>, Option<String>)> {
    let plan_ids: Vec<Uuid> = [state.left_plan_id, state.right_plan_id]
        .into_iter()
        .flatten()
        .collect();
    if plan_ids.is_empty() {
        return Ok((None, None));
    }

    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        r#"
        SELECT p.id, t.title
        FROM rrgt_plans p
        JOIN tasks t ON t.id = p.task_id
        WHERE p.id = ANY($1) AND p.team_member_id = $2
        "#,
    )
    .bind(&plan_ids)
    .bind(state.team_member_id)
    .fetch_all(pool)
    .await?;
    let titles: HashMap<Uuid, String> = rows.into_iter().collect();

    let left = state.left_plan_id.and_then(|id| titles.get(&id).cloned());
    let right = state.right_plan_id.and_then(|id| titles.get(&id).cloned());
    Ok((left, right))
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Create or partially update the caller's dial.
///
/// Both sides' plan references are checked against the caller's plans in a
/// single query before any write; a failed check names the offending side
/// and leaves the stored state untouched.
pub async fn write_dial(pool: &PgPool, identity: &Identity, patch: &DialPatch) -> Result<DialView> {
    patch.validate()?;
    check_plan_ownership(pool, identity.team_member_id, patch).await?;

    let existing = fetch_state(pool, identity.team_member_id).await?;
    let merged = merge_patch(
        existing.unwrap_or_else(|| DialState::empty(identity.team_member_id)),
        patch,
    );

    let state: DialState = sqlx::query_as(
        r#"
        INSERT INTO dial_states (team_member_id, left_plan_id, left_column_index, left_text,
                                 right_plan_id, right_column_index, selected_slot,
                                 is_left_private, is_right_private)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (team_member_id) DO UPDATE
            SET left_plan_id = EXCLUDED.left_plan_id,
                left_column_index = EXCLUDED.left_column_index,
                left_text = EXCLUDED.left_text,
                right_plan_id = EXCLUDED.right_plan_id,
                right_column_index = EXCLUDED.right_column_index,
                selected_slot = EXCLUDED.selected_slot,
                is_left_private = EXCLUDED.is_left_private,
                is_right_private = EXCLUDED.is_right_private,
                updated_at = now()
        RETURNING team_member_id, left_plan_id, left_column_index, left_text,
                  right_plan_id, right_column_index, selected_slot,
                  is_left_private, is_right_private, created_at, updated_at
        "#,
    )
    .bind(merged.team_member_id)
    .bind(merged.left_plan_id)
    .bind(merged.left_column_index)
    .bind(&merged.left_text)
    .bind(merged.right_plan_id)
    .bind(merged.right_column_index)
    .bind(&merged.selected_slot)
    .bind(merged.is_left_private)
    .bind(merged.is_right_private)
    .fetch_one(pool)
    .await?;

    let (left_title, right_title) = resolve_titles(pool, &state).await?;
    Ok(DialView::from_state(state, left_title, right_title))
}

/// Verify that every plan id the patch sets belongs to the caller.
async fn check_plan_ownership(
    pool: &PgPool,
    team_member_id: Uuid,
    patch: &DialPatch,
) -> Result<()> {
    let left = patch.left_plan_id.flatten();
    let right = patch.right_plan_id.flatten();
    let referenced: Vec<Uuid> = [left, right].into_iter().flatten().collect();
    if referenced.is_empty() {
        return Ok(());
    }

    let owned: Vec<(Uuid,)> =
        sqlx::query_as("SELECT id FROM rrgt_plans WHERE id = ANY($1) AND team_member_id = $2")
            .bind(&referenced)
            .bind(team_member_id)
            .fetch_all(pool)
            .await?;
    let owned: std::collections::HashSet<Uuid> = owned.into_iter().map(|(id,)| id).collect();

    if let Some(id) = left {
        if !owned.contains(&id) {
            return Err(RrgtError::DialPlanNotOwned { side: Slot::Left });
        }
    }
    if let Some(id) = right {
        if !owned.contains(&id) {
            return Err(RrgtError::DialPlanNotOwned { side: Slot::Right });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

/// Blank out the private sides of a dial for cross-member (god-view)
/// display. The privacy flags themselves stay visible.
pub fn redact_private(mut view: DialView) -> DialView {
    if view.is_left_private {
        view.left_plan_id = None;
        view.left_column_index = None;
        view.left_text = None;
        view.left_task_title = None;
    }
    if view.is_right_private {
        view.right_plan_id = None;
        view.right_column_index = None;
        view.right_task_title = None;
    }
    view
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> DialState {
        let mut state = DialState::empty(Uuid::new_v4());
        state.left_plan_id = Some(Uuid::new_v4());
        state.left_column_index = Some(2);
        state.left_text = Some("draft the brief".into());
        state.right_plan_id = Some(Uuid::new_v4());
        state.selected_slot = Some("right".into());
        state
    }

    #[test]
    fn absent_fields_are_left_unchanged() {
        let state = base_state();
        let before = state.clone();
        let patch: DialPatch = serde_json::from_str(r#"{ "selected_slot": "left" }"#).unwrap();

        let merged = merge_patch(state, &patch);
        assert_eq!(merged.selected_slot.as_deref(), Some("left"));
        assert_eq!(merged.left_plan_id, before.left_plan_id);
        assert_eq!(merged.right_plan_id, before.right_plan_id);
        assert_eq!(merged.left_text, before.left_text);
        assert_eq!(merged.left_column_index, before.left_column_index);
    }

    #[test]
    fn explicit_null_clears_a_slot() {
        let state = base_state();
        let patch: DialPatch =
            serde_json::from_str(r#"{ "left_plan_id": null, "left_text": null }"#).unwrap();

        let merged = merge_patch(state, &patch);
        assert_eq!(merged.left_plan_id, None);
        assert_eq!(merged.left_text, None);
        // Untouched side survives.
        assert!(merged.right_plan_id.is_some());
    }

    #[test]
    fn privacy_flags_merge_independently() {
        let state = base_state();
        let patch: DialPatch = serde_json::from_str(r#"{ "is_left_private": true }"#).unwrap();

        let merged = merge_patch(state, &patch);
        assert!(merged.is_left_private);
        assert!(!merged.is_right_private);
    }

    #[test]
    fn bad_selected_slot_fails_validation() {
        let patch: DialPatch = serde_json::from_str(r#"{ "selected_slot": "both" }"#).unwrap();
        assert!(patch.validate().is_err());

        let patch: DialPatch = serde_json::from_str(r#"{ "selected_slot": null }"#).unwrap();
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn right_text_is_accepted_and_ignored() {
        let state = base_state();
        let patch: DialPatch =
            serde_json::from_str(r#"{ "right_text": "scratch note" }"#).unwrap();
        let merged = merge_patch(state.clone(), &patch);
        assert_eq!(merged.left_text, state.left_text);
    }

    #[test]
    fn redaction_blanks_only_private_sides() {
        let mut state = base_state();
        state.is_left_private = true;
        let view = DialView::from_state(state, Some("left task".into()), Some("right task".into()));

        let redacted = redact_private(view);
        assert_eq!(redacted.left_plan_id, None);
        assert_eq!(redacted.left_task_title, None);
        assert_eq!(redacted.left_text, None);
        assert!(redacted.is_left_private);
        assert!(redacted.right_plan_id.is_some());
        assert_eq!(redacted.right_task_title.as_deref(), Some("right task"));
    }
}

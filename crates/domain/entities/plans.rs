use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::{branch_settings, plans};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub duration_days: i32,
    pub price_minor: i64,
    pub max_freeze_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-branch knobs read by the freeze calculator.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = branch_settings, primary_key(branch_id))]
pub struct BranchSettingsEntity {
    pub branch_id: Uuid,
    pub freeze_fee_minor: i64,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

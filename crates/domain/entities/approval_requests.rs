use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::approval_requests;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = approval_requests)]
pub struct ApprovalRequestEntity {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub approval_type: String,
    pub reference_type: String,
    pub reference_id: Uuid,
    pub request_data: serde_json::Value,
    pub status: String,
    pub requested_by: Uuid,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = approval_requests)]
pub struct InsertApprovalRequestEntity {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub approval_type: String,
    pub reference_type: String,
    pub reference_id: Uuid,
    pub request_data: serde_json::Value,
    pub status: String,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
}

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::memberships;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = memberships)]
pub struct MembershipEntity {
    pub id: Uuid,
    pub member_id: Uuid,
    pub plan_id: Uuid,
    pub branch_id: Uuid,
    pub start_date: NaiveDate,
    pub original_end_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub price_paid_minor: i64,
    pub discount_amount_minor: i64,
    pub total_freeze_days_used: i32,
    pub created_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub refund_amount_minor: Option<i64>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

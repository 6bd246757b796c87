use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::freeze_histories;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = freeze_histories)]
pub struct FreezeHistoryEntity {
    pub id: Uuid,
    pub membership_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_frozen: i32,
    pub reason: Option<String>,
    pub fee_charged_minor: i64,
    pub status: String,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Ids are minted by the caller so the approval snapshot can point at the row
/// before either is written.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = freeze_histories)]
pub struct InsertFreezeHistoryEntity {
    pub id: Uuid,
    pub membership_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_frozen: i32,
    pub reason: Option<String>,
    pub fee_charged_minor: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

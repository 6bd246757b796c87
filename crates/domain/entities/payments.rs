use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::payments;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub invoice_id: Uuid,
    pub member_id: Uuid,
    pub branch_id: Uuid,
    pub amount_minor: i64,
    pub method: String,
    pub status: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

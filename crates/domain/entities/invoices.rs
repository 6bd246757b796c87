use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::{invoice_items, invoices};

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invoices)]
pub struct InsertInvoiceEntity {
    pub branch_id: Uuid,
    pub member_id: Uuid,
    pub invoice_number: String,
    pub amount_minor: i64,
    pub status: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invoice_items)]
pub struct InsertInvoiceItemEntity {
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price_minor: i64,
    pub total_minor: i64,
}

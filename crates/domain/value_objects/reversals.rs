use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{
    invoices::{InsertInvoiceEntity, InsertInvoiceItemEntity},
    payments::InsertPaymentEntity,
};

use super::enums::{
    invoice_statuses::InvoiceStatus, payment_methods::PaymentMethod,
    payment_statuses::PaymentStatus, reference_types::ReferenceType,
};

/// A refund to be written as a negative invoice, item and payment.
/// `amount_minor` is the positive magnitude handed back to the member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalSpec {
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub branch_id: Uuid,
    pub member_id: Uuid,
    pub amount_minor: i64,
    pub reason: String,
    pub method: PaymentMethod,
    pub recorded_by: Uuid,
}

impl ReversalSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.amount_minor <= 0 {
            return Err("reversal amount must be positive".to_string());
        }
        if self.reason.trim().is_empty() {
            return Err("reversal reason is required".to_string());
        }
        Ok(())
    }

    pub fn ledger_amount_minor(&self) -> i64 {
        -self.amount_minor
    }

    /// Derived from the reference so a replay collides on the unique column.
    pub fn invoice_number(&self) -> String {
        format!("RF-{}", self.reference_id.simple()).to_uppercase()
    }

    pub fn ledger_rows(&self, recorded_at: DateTime<Utc>) -> ReversalRows {
        let notes = Some(format!("{} (recorded by {})", self.reason.trim(), self.recorded_by));
        let amount = self.ledger_amount_minor();

        ReversalRows {
            invoice: InsertInvoiceEntity {
                branch_id: self.branch_id,
                member_id: self.member_id,
                invoice_number: self.invoice_number(),
                amount_minor: amount,
                status: InvoiceStatus::Refunded.to_string(),
                reference_type: Some(self.reference_type.to_string()),
                reference_id: Some(self.reference_id),
                notes: notes.clone(),
                issued_at: recorded_at,
            },
            item_description: format!("Refund: {}", self.reason.trim()),
            item_amount_minor: amount,
            payment_method: self.method.to_string(),
            payment_status: PaymentStatus::Refunded.to_string(),
            payment_notes: notes,
            recorded_at,
        }
    }
}

/// Ledger rows for one reversal. Item and payment get their `invoice_id`
/// once the invoice insert returns it.
#[derive(Debug, Clone)]
pub struct ReversalRows {
    pub invoice: InsertInvoiceEntity,
    item_description: String,
    item_amount_minor: i64,
    payment_method: String,
    payment_status: String,
    payment_notes: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl ReversalRows {
    pub fn item(&self, invoice_id: Uuid) -> InsertInvoiceItemEntity {
        InsertInvoiceItemEntity {
            invoice_id,
            description: self.item_description.clone(),
            quantity: 1,
            unit_price_minor: self.item_amount_minor,
            total_minor: self.item_amount_minor,
        }
    }

    pub fn payment(&self, invoice_id: Uuid) -> InsertPaymentEntity {
        InsertPaymentEntity {
            invoice_id,
            member_id: self.invoice.member_id,
            branch_id: self.invoice.branch_id,
            amount_minor: self.item_amount_minor,
            method: self.payment_method.clone(),
            status: self.payment_status.clone(),
            reference_type: self.invoice.reference_type.clone(),
            reference_id: self.invoice.reference_id,
            notes: self.payment_notes.clone(),
            paid_at: self.recorded_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalReceipt {
    pub reversal_id: Uuid,
    /// `false` when an earlier reversal for the same reference was returned.
    pub created: bool,
}

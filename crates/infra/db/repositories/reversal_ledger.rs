use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    PgConnection,
    insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::{PgPoolSquad, checkout},
        schema::{invoice_items, invoices, payments},
    },
};
use domain::{
    repositories::reversal_ledger::ReversalLedgerRepository,
    value_objects::{
        enums::reference_types::ReferenceType,
        reversals::{ReversalReceipt, ReversalSpec},
    },
};

pub struct ReversalLedgerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ReversalLedgerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn find_existing_reversal(
    conn: &mut PgConnection,
    reference_type: ReferenceType,
    reference_id: Uuid,
) -> QueryResult<Option<Uuid>> {
    invoices::table
        .filter(invoices::reference_type.eq(reference_type.to_string()))
        .filter(invoices::reference_id.eq(reference_id))
        .filter(invoices::amount_minor.lt(0))
        .order(invoices::created_at.asc())
        .select(invoices::id)
        .first::<Uuid>(conn)
        .optional()
}

/// Writes invoice, item and payment for `spec` on an open transaction, or
/// returns the reversal already recorded for the same reference.
pub(crate) fn write_reversal(
    conn: &mut PgConnection,
    spec: &ReversalSpec,
    recorded_at: DateTime<Utc>,
) -> Result<ReversalReceipt> {
    if let Some(reversal_id) = find_existing_reversal(conn, spec.reference_type, spec.reference_id)? {
        return Ok(ReversalReceipt {
            reversal_id,
            created: false,
        });
    }

    let rows = spec.ledger_rows(recorded_at);

    let invoice_id = insert_into(invoices::table)
        .values(&rows.invoice)
        .returning(invoices::id)
        .get_result::<Uuid>(conn)?;

    insert_into(invoice_items::table)
        .values(&rows.item(invoice_id))
        .execute(conn)?;

    insert_into(payments::table)
        .values(&rows.payment(invoice_id))
        .execute(conn)?;

    Ok(ReversalReceipt {
        reversal_id: invoice_id,
        created: true,
    })
}

pub(crate) fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<DieselError>(),
        Some(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
    )
}

#[async_trait]
impl ReversalLedgerRepository for ReversalLedgerPostgres {
    async fn apply_reversal(
        &self,
        spec: ReversalSpec,
        recorded_at: DateTime<Utc>,
    ) -> Result<ReversalReceipt> {
        let mut conn = checkout(&self.db_pool)?;

        let written = conn.transaction::<_, anyhow::Error, _>(|conn| {
            write_reversal(conn, &spec, recorded_at)
        });

        match written {
            Ok(receipt) => Ok(receipt),
            // a concurrent writer won the unique index; hand back its row
            Err(err) if is_unique_violation(&err) => {
                warn!(
                    reference_type = %spec.reference_type,
                    reference_id = %spec.reference_id,
                    "reversal_ledger: concurrent reversal detected, returning existing row"
                );
                let existing =
                    find_existing_reversal(&mut conn, spec.reference_type, spec.reference_id)?;
                match existing {
                    Some(reversal_id) => Ok(ReversalReceipt {
                        reversal_id,
                        created: false,
                    }),
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }
}

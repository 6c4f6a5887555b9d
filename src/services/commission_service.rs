use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::commission_repository::{CommissionRepository, CommissionRow};
use crate::db::repositories::format_timestamp;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::commission::{CommissionLedger, CommissionRecord, CommissionRollup};
use crate::models::context::{RequestContext, Scope};
use crate::services::customer_service;

/// Share of the sale price paid out as commission.
pub const COMMISSION_RATE: f64 = 0.05;
/// Share of the commission paid on deposit; the rest is paid on installation.
pub const DEPOSIT_SHARE: f64 = 0.5;

/// Builds the commission for a sale. The deposit half is paid immediately
/// because the deposit is what triggers the sale.
pub fn build_commission(
    customer_id: &str,
    rep_id: Option<&str>,
    total_sale_price: f64,
    now: DateTime<Utc>,
) -> AppResult<CommissionRecord> {
    if !total_sale_price.is_finite() || total_sale_price <= 0.0 {
        return Err(AppError::invalid_amount(total_sale_price));
    }

    let commission_amount = total_sale_price * COMMISSION_RATE;
    // The final share is the remainder so the two shares sum back to
    // `commission_amount` even when halving rounds (subnormal amounts).
    let deposit_commission = commission_amount * DEPOSIT_SHARE;
    let final_commission = commission_amount - deposit_commission;

    Ok(CommissionRecord {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        rep_id: rep_id.map(str::to_string),
        total_sale_price,
        commission_amount,
        deposit_commission,
        final_commission,
        deposit_paid: true,
        deposit_paid_date: Some(now),
        final_paid: false,
        final_paid_date: None,
        created_at: now,
    })
}

pub fn insert(conn: &Connection, record: &CommissionRecord) -> AppResult<()> {
    CommissionRepository::insert(conn, &CommissionRow::from_record(record))?;
    info!(
        target: "crm::commission",
        commission_id = %record.id,
        customer_id = %record.customer_id,
        amount = record.commission_amount,
        "commission created"
    );
    Ok(())
}

/// Releases the final half of every unpaid commission for `customer_id`.
///
/// Returns the records that were released; an empty vector means there was
/// nothing outstanding, which is not an error.
pub fn release_final(
    conn: &Connection,
    customer_id: &str,
    now: DateTime<Utc>,
) -> AppResult<Vec<CommissionRecord>> {
    let unpaid = CommissionRepository::list_unpaid_for_customer(conn, customer_id)?;
    let paid_at = format_timestamp(&now);

    let mut released = Vec::with_capacity(unpaid.len());
    for row in unpaid {
        if !CommissionRepository::mark_final_paid(conn, &row.id, &paid_at)? {
            continue;
        }
        let mut record = row.into_record()?;
        record.final_paid = true;
        record.final_paid_date = Some(now);
        released.push(record);
    }

    if released.len() > 1 {
        info!(
            target: "crm::commission",
            %customer_id,
            count = released.len(),
            "released more than one outstanding commission for a customer"
        );
    }
    debug!(target: "crm::commission", %customer_id, count = released.len(), "final commission release");
    Ok(released)
}

pub fn rollup(commissions: &[CommissionRecord]) -> CommissionRollup {
    commissions
        .iter()
        .fold(CommissionRollup::default(), |mut acc, commission| {
            acc.total += commission.commission_amount;
            if commission.final_paid {
                acc.completed += commission.commission_amount;
            } else {
                acc.pending += commission.final_commission;
            }
            acc
        })
}

#[derive(Clone)]
pub struct CommissionService {
    db: DbPool,
}

impl CommissionService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Admins and owners see every commission; reps see their own.
    pub fn ledger(&self, ctx: &RequestContext) -> AppResult<CommissionLedger> {
        let rows = self.db.with_connection(|conn| match ctx.scope() {
            Scope::All => CommissionRepository::list_all(conn),
            Scope::Rep(rep_id) => CommissionRepository::list_by_rep(conn, &rep_id),
        })?;
        let items = rows
            .into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()?;
        let rollup = rollup(&items);
        debug!(target: "crm::commission", count = items.len(), "commission ledger loaded");
        Ok(CommissionLedger { items, rollup })
    }

    /// Commissions booked against one customer. Reps only see their own
    /// customers.
    pub fn for_customer(
        &self,
        ctx: &RequestContext,
        customer_id: &str,
    ) -> AppResult<Vec<CommissionRecord>> {
        let rows = self.db.with_connection(|conn| {
            let customer = customer_service::load_customer(conn, customer_id)?;
            customer_service::ensure_visible(ctx, &customer)?;
            CommissionRepository::list_for_customer(conn, customer_id)
        })?;
        rows.into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()
    }

    pub fn get(&self, ctx: &RequestContext, id: &str) -> AppResult<CommissionRecord> {
        let record = self
            .db
            .with_connection(|conn| CommissionRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?
            .into_record()?;
        if let Scope::Rep(rep_id) = ctx.scope() {
            if record.rep_id.as_deref() != Some(rep_id.as_str()) {
                return Err(AppError::forbidden(format!(
                    "commission {id} belongs to another rep"
                )));
            }
        }
        Ok(record)
    }
}

use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use super::{format_timestamp, format_timestamp_opt, parse_timestamp, parse_timestamp_opt};
use crate::error::{AppError, AppResult};
use crate::models::commission::CommissionRecord;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        customer_id,
        rep_id,
        total_sale_price,
        commission_amount,
        deposit_commission,
        final_commission,
        deposit_paid,
        deposit_paid_date,
        final_paid,
        final_paid_date,
        created_at
    FROM commissions
"#;

#[derive(Debug, Clone)]
pub struct CommissionRow {
    pub id: String,
    pub customer_id: String,
    pub rep_id: Option<String>,
    pub total_sale_price: f64,
    pub commission_amount: f64,
    pub deposit_commission: f64,
    pub final_commission: f64,
    pub deposit_paid: bool,
    pub deposit_paid_date: Option<String>,
    pub final_paid: bool,
    pub final_paid_date: Option<String>,
    pub created_at: String,
}

impl CommissionRow {
    pub fn from_record(record: &CommissionRecord) -> Self {
        Self {
            id: record.id.clone(),
            customer_id: record.customer_id.clone(),
            rep_id: record.rep_id.clone(),
            total_sale_price: record.total_sale_price,
            commission_amount: record.commission_amount,
            deposit_commission: record.deposit_commission,
            final_commission: record.final_commission,
            deposit_paid: record.deposit_paid,
            deposit_paid_date: format_timestamp_opt(record.deposit_paid_date.as_ref()),
            final_paid: record.final_paid,
            final_paid_date: format_timestamp_opt(record.final_paid_date.as_ref()),
            created_at: format_timestamp(&record.created_at),
        }
    }

    pub fn into_record(self) -> AppResult<CommissionRecord> {
        Ok(CommissionRecord {
            id: self.id,
            customer_id: self.customer_id,
            rep_id: self.rep_id,
            total_sale_price: self.total_sale_price,
            commission_amount: self.commission_amount,
            deposit_commission: self.deposit_commission,
            final_commission: self.final_commission,
            deposit_paid: self.deposit_paid,
            deposit_paid_date: parse_timestamp_opt(self.deposit_paid_date)?,
            final_paid: self.final_paid,
            final_paid_date: parse_timestamp_opt(self.final_paid_date)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for CommissionRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(CommissionRow {
            id: row.get("id")?,
            customer_id: row.get("customer_id")?,
            rep_id: row.get("rep_id")?,
            total_sale_price: row.get("total_sale_price")?,
            commission_amount: row.get("commission_amount")?,
            deposit_commission: row.get("deposit_commission")?,
            final_commission: row.get("final_commission")?,
            deposit_paid: row.get::<_, i64>("deposit_paid")? != 0,
            deposit_paid_date: row.get("deposit_paid_date")?,
            final_paid: row.get::<_, i64>("final_paid")? != 0,
            final_paid_date: row.get("final_paid_date")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct CommissionRepository;

impl CommissionRepository {
    pub fn insert(conn: &Connection, row: &CommissionRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO commissions (
                    id,
                    customer_id,
                    rep_id,
                    total_sale_price,
                    commission_amount,
                    deposit_commission,
                    final_commission,
                    deposit_paid,
                    deposit_paid_date,
                    final_paid,
                    final_paid_date,
                    created_at
                ) VALUES (
                    :id,
                    :customer_id,
                    :rep_id,
                    :total_sale_price,
                    :commission_amount,
                    :deposit_commission,
                    :final_commission,
                    :deposit_paid,
                    :deposit_paid_date,
                    :final_paid,
                    :final_paid_date,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":customer_id": &row.customer_id,
                ":rep_id": &row.rep_id,
                ":total_sale_price": &row.total_sale_price,
                ":commission_amount": &row.commission_amount,
                ":deposit_commission": &row.deposit_commission,
                ":final_commission": &row.final_commission,
                ":deposit_paid": row.deposit_paid as i64,
                ":deposit_paid_date": &row.deposit_paid_date,
                ":final_paid": row.final_paid as i64,
                ":final_paid_date": &row.final_paid_date,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    /// Flips `final_paid` only while it is still unset, so a release that lost
    /// a race touches nothing.
    pub fn mark_final_paid(conn: &Connection, id: &str, paid_at: &str) -> AppResult<bool> {
        let affected = conn.execute(
            r#"
                UPDATE commissions
                SET final_paid = 1, final_paid_date = :paid_at
                WHERE id = :id AND final_paid = 0
            "#,
            named_params! {":id": id, ":paid_at": paid_at},
        )?;
        Ok(affected > 0)
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<CommissionRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| CommissionRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_unpaid_for_customer(
        conn: &Connection,
        customer_id: &str,
    ) -> AppResult<Vec<CommissionRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE customer_id = ?1 AND final_paid = 0 ORDER BY created_at ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([customer_id], |row| CommissionRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_for_customer(conn: &Connection, customer_id: &str) -> AppResult<Vec<CommissionRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE customer_id = ?1 ORDER BY created_at ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([customer_id], |row| CommissionRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_by_rep(conn: &Connection, rep_id: &str) -> AppResult<Vec<CommissionRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE rep_id = ?1 ORDER BY created_at DESC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([rep_id], |row| CommissionRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<CommissionRow>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY created_at DESC", BASE_SELECT))?;
        let rows = stmt
            .query_map([], |row| CommissionRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use super::{format_timestamp, format_timestamp_opt, parse_timestamp, parse_timestamp_opt};
use crate::error::{AppError, AppResult};
use crate::models::customer::{CustomerRecord, CustomerStatus, InstallationType};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        name,
        email,
        mobile,
        postcode,
        address,
        property_type,
        heating_system,
        installation_type,
        estimated_value,
        notes,
        status,
        bus_grant_eligible,
        assigned_rep_id,
        deposit_received,
        deposit_amount,
        deposit_received_date,
        installation_completed_date,
        created_by,
        created_at,
        last_contacted,
        updated_at,
        version
    FROM customers
"#;

#[derive(Debug, Clone)]
pub struct CustomerRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub postcode: String,
    pub address: String,
    pub property_type: Option<String>,
    pub heating_system: Option<String>,
    pub installation_type: Option<String>,
    pub estimated_value: f64,
    pub notes: Option<String>,
    pub status: String,
    pub bus_grant_eligible: bool,
    pub assigned_rep_id: Option<String>,
    pub deposit_received: bool,
    pub deposit_amount: Option<f64>,
    pub deposit_received_date: Option<String>,
    pub installation_completed_date: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub last_contacted: Option<String>,
    pub updated_at: String,
    pub version: i64,
}

impl CustomerRow {
    pub fn from_record(record: &CustomerRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
            mobile: record.mobile.clone(),
            postcode: record.postcode.clone(),
            address: record.address.clone(),
            property_type: record.property_type.clone(),
            heating_system: record.heating_system.clone(),
            installation_type: record
                .installation_type
                .map(|kind| kind.as_str().to_string()),
            estimated_value: record.estimated_value,
            notes: record.notes.clone(),
            status: record.status.as_str().to_string(),
            bus_grant_eligible: record.bus_grant_eligible,
            assigned_rep_id: record.assigned_rep_id.clone(),
            deposit_received: record.deposit_received,
            deposit_amount: record.deposit_amount,
            deposit_received_date: format_timestamp_opt(record.deposit_received_date.as_ref()),
            installation_completed_date: format_timestamp_opt(
                record.installation_completed_date.as_ref(),
            ),
            created_by: record.created_by.clone(),
            created_at: format_timestamp(&record.created_at),
            last_contacted: format_timestamp_opt(record.last_contacted.as_ref()),
            updated_at: format_timestamp(&record.updated_at),
            version: record.version,
        }
    }

    pub fn into_record(self) -> AppResult<CustomerRecord> {
        let status = CustomerStatus::try_from(self.status.as_str()).map_err(AppError::database)?;
        let installation_type = match self.installation_type {
            Some(raw) => {
                Some(InstallationType::try_from(raw.as_str()).map_err(AppError::database)?)
            }
            None => None,
        };

        Ok(CustomerRecord {
            id: self.id,
            name: self.name,
            email: self.email,
            mobile: self.mobile,
            postcode: self.postcode,
            address: self.address,
            property_type: self.property_type,
            heating_system: self.heating_system,
            installation_type,
            estimated_value: self.estimated_value,
            notes: self.notes,
            status,
            bus_grant_eligible: self.bus_grant_eligible,
            assigned_rep_id: self.assigned_rep_id,
            deposit_received: self.deposit_received,
            deposit_amount: self.deposit_amount,
            deposit_received_date: parse_timestamp_opt(self.deposit_received_date)?,
            installation_completed_date: parse_timestamp_opt(self.installation_completed_date)?,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at)?,
            last_contacted: parse_timestamp_opt(self.last_contacted)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            version: self.version,
        })
    }
}

impl TryFrom<&Row<'_>> for CustomerRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(CustomerRow {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            mobile: row.get("mobile")?,
            postcode: row.get("postcode")?,
            address: row.get("address")?,
            property_type: row.get("property_type")?,
            heating_system: row.get("heating_system")?,
            installation_type: row.get("installation_type")?,
            estimated_value: row.get("estimated_value")?,
            notes: row.get("notes")?,
            status: row.get("status")?,
            bus_grant_eligible: row.get::<_, i64>("bus_grant_eligible")? != 0,
            assigned_rep_id: row.get("assigned_rep_id")?,
            deposit_received: row.get::<_, i64>("deposit_received")? != 0,
            deposit_amount: row.get("deposit_amount")?,
            deposit_received_date: row.get("deposit_received_date")?,
            installation_completed_date: row.get("installation_completed_date")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            last_contacted: row.get("last_contacted")?,
            updated_at: row.get("updated_at")?,
            version: row.get("version")?,
        })
    }
}

pub struct CustomerRepository;

impl CustomerRepository {
    pub fn insert(conn: &Connection, row: &CustomerRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO customers (
                    id,
                    name,
                    email,
                    mobile,
                    postcode,
                    address,
                    property_type,
                    heating_system,
                    installation_type,
                    estimated_value,
                    notes,
                    status,
                    bus_grant_eligible,
                    assigned_rep_id,
                    deposit_received,
                    deposit_amount,
                    deposit_received_date,
                    installation_completed_date,
                    created_by,
                    created_at,
                    last_contacted,
                    updated_at,
                    version
                ) VALUES (
                    :id,
                    :name,
                    :email,
                    :mobile,
                    :postcode,
                    :address,
                    :property_type,
                    :heating_system,
                    :installation_type,
                    :estimated_value,
                    :notes,
                    :status,
                    :bus_grant_eligible,
                    :assigned_rep_id,
                    :deposit_received,
                    :deposit_amount,
                    :deposit_received_date,
                    :installation_completed_date,
                    :created_by,
                    :created_at,
                    :last_contacted,
                    :updated_at,
                    :version
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":email": &row.email,
                ":mobile": &row.mobile,
                ":postcode": &row.postcode,
                ":address": &row.address,
                ":property_type": &row.property_type,
                ":heating_system": &row.heating_system,
                ":installation_type": &row.installation_type,
                ":estimated_value": &row.estimated_value,
                ":notes": &row.notes,
                ":status": &row.status,
                ":bus_grant_eligible": row.bus_grant_eligible as i64,
                ":assigned_rep_id": &row.assigned_rep_id,
                ":deposit_received": row.deposit_received as i64,
                ":deposit_amount": &row.deposit_amount,
                ":deposit_received_date": &row.deposit_received_date,
                ":installation_completed_date": &row.installation_completed_date,
                ":created_by": &row.created_by,
                ":created_at": &row.created_at,
                ":last_contacted": &row.last_contacted,
                ":updated_at": &row.updated_at,
                ":version": &row.version,
            },
        )?;

        Ok(())
    }

    /// Writes every mutable column of `row` if the stored version still equals
    /// `row.version`, then bumps the version. A stale version yields
    /// `Conflict`; a missing id yields `NotFound`.
    pub fn update_versioned(conn: &Connection, row: &CustomerRow) -> AppResult<i64> {
        let affected = conn.execute(
            r#"
                UPDATE customers SET
                    name = :name,
                    email = :email,
                    mobile = :mobile,
                    postcode = :postcode,
                    address = :address,
                    property_type = :property_type,
                    heating_system = :heating_system,
                    installation_type = :installation_type,
                    estimated_value = :estimated_value,
                    notes = :notes,
                    status = :status,
                    bus_grant_eligible = :bus_grant_eligible,
                    assigned_rep_id = :assigned_rep_id,
                    deposit_received = :deposit_received,
                    deposit_amount = :deposit_amount,
                    deposit_received_date = :deposit_received_date,
                    installation_completed_date = :installation_completed_date,
                    last_contacted = :last_contacted,
                    updated_at = :updated_at,
                    version = version + 1
                WHERE id = :id AND version = :version
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":email": &row.email,
                ":mobile": &row.mobile,
                ":postcode": &row.postcode,
                ":address": &row.address,
                ":property_type": &row.property_type,
                ":heating_system": &row.heating_system,
                ":installation_type": &row.installation_type,
                ":estimated_value": &row.estimated_value,
                ":notes": &row.notes,
                ":status": &row.status,
                ":bus_grant_eligible": row.bus_grant_eligible as i64,
                ":assigned_rep_id": &row.assigned_rep_id,
                ":deposit_received": row.deposit_received as i64,
                ":deposit_amount": &row.deposit_amount,
                ":deposit_received_date": &row.deposit_received_date,
                ":installation_completed_date": &row.installation_completed_date,
                ":last_contacted": &row.last_contacted,
                ":updated_at": &row.updated_at,
                ":version": &row.version,
            },
        )?;

        if affected == 0 {
            let exists = Self::find_by_id(conn, &row.id)?.is_some();
            if !exists {
                return Err(AppError::not_found());
            }
            return Err(AppError::conflict(format!(
                "customer {} was modified concurrently",
                row.id
            )));
        }

        Ok(row.version + 1)
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<CustomerRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| CustomerRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<CustomerRow>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY created_at DESC", BASE_SELECT))?;
        let rows = stmt
            .query_map([], |row| CustomerRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_by_rep(conn: &Connection, rep_id: &str) -> AppResult<Vec<CustomerRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE assigned_rep_id = ?1 ORDER BY created_at DESC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([rep_id], |row| CustomerRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

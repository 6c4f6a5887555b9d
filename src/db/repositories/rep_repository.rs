use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp};
use crate::error::{AppError, AppResult};
use crate::models::context::Role;
use crate::models::rep::{RepRecord, RepStatus};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        name,
        email,
        mobile,
        region,
        postcodes,
        max_travel_time,
        max_travel_miles,
        calendar_id,
        role,
        status,
        created_by,
        created_at
    FROM reps
"#;

#[derive(Debug, Clone)]
pub struct RepRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub region: Option<String>,
    pub postcodes: Option<String>,
    pub max_travel_time: f64,
    pub max_travel_miles: f64,
    pub calendar_id: Option<String>,
    pub role: String,
    pub status: String,
    pub created_by: String,
    pub created_at: String,
}

impl RepRow {
    pub fn from_record(record: &RepRecord) -> AppResult<Self> {
        let postcodes = if record.postcodes.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&record.postcodes)?)
        };

        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
            mobile: record.mobile.clone(),
            region: record.region.clone(),
            postcodes,
            max_travel_time: record.max_travel_time,
            max_travel_miles: record.max_travel_miles,
            calendar_id: record.calendar_id.clone(),
            role: record.role.as_str().to_string(),
            status: record.status.as_str().to_string(),
            created_by: record.created_by.clone(),
            created_at: format_timestamp(&record.created_at),
        })
    }

    pub fn into_record(self) -> AppResult<RepRecord> {
        let postcodes = match self.postcodes {
            Some(value) if !value.is_empty() => serde_json::from_str(&value)?,
            _ => Vec::new(),
        };

        Ok(RepRecord {
            id: self.id,
            name: self.name,
            email: self.email,
            mobile: self.mobile,
            region: self.region,
            postcodes,
            max_travel_time: self.max_travel_time,
            max_travel_miles: self.max_travel_miles,
            calendar_id: self.calendar_id,
            role: Role::try_from(self.role.as_str()).map_err(AppError::database)?,
            status: RepStatus::try_from(self.status.as_str()).map_err(AppError::database)?,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for RepRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(RepRow {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            mobile: row.get("mobile")?,
            region: row.get("region")?,
            postcodes: row.get("postcodes")?,
            max_travel_time: row.get("max_travel_time")?,
            max_travel_miles: row.get("max_travel_miles")?,
            calendar_id: row.get("calendar_id")?,
            role: row.get("role")?,
            status: row.get("status")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct RepRepository;

impl RepRepository {
    pub fn insert(conn: &Connection, row: &RepRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO reps (
                    id,
                    name,
                    email,
                    mobile,
                    region,
                    postcodes,
                    max_travel_time,
                    max_travel_miles,
                    calendar_id,
                    role,
                    status,
                    created_by,
                    created_at
                ) VALUES (
                    :id,
                    :name,
                    :email,
                    :mobile,
                    :region,
                    :postcodes,
                    :max_travel_time,
                    :max_travel_miles,
                    :calendar_id,
                    :role,
                    :status,
                    :created_by,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":email": &row.email,
                ":mobile": &row.mobile,
                ":region": &row.region,
                ":postcodes": &row.postcodes,
                ":max_travel_time": &row.max_travel_time,
                ":max_travel_miles": &row.max_travel_miles,
                ":calendar_id": &row.calendar_id,
                ":role": &row.role,
                ":status": &row.status,
                ":created_by": &row.created_by,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<RepRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| RepRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_by_role(conn: &Connection, role: Role) -> AppResult<Vec<RepRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE role = ?1 ORDER BY name ASC", BASE_SELECT))?;
        let rows = stmt
            .query_map([role.as_str()], |row| RepRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<RepRow>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY name ASC", BASE_SELECT))?;
        let rows = stmt
            .query_map([], |row| RepRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};

use super::{format_timestamp, parse_timestamp};
use crate::error::AppResult;
use crate::models::activity::ActivityRecord;

#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: String,
    pub created_by: String,
}

impl ActivityRow {
    pub fn from_record(record: &ActivityRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            created_at: format_timestamp(&record.created_at),
            created_by: record.created_by.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<ActivityRecord> {
        Ok(ActivityRecord {
            id: self.id,
            title: self.title,
            description: self.description,
            created_at: parse_timestamp(&self.created_at)?,
            created_by: self.created_by,
        })
    }
}

impl TryFrom<&Row<'_>> for ActivityRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            created_by: row.get("created_by")?,
        })
    }
}

/// Append-only log; rows are never updated or deleted.
pub struct ActivityRepository;

impl ActivityRepository {
    pub fn insert(conn: &Connection, row: &ActivityRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO activities (id, title, description, created_at, created_by)
                VALUES (:id, :title, :description, :created_at, :created_by)
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":description": &row.description,
                ":created_at": &row.created_at,
                ":created_by": &row.created_by,
            },
        )?;
        Ok(())
    }

    /// Newest first. Ties on `created_at` fall back to insertion order.
    pub fn list_recent(conn: &Connection, limit: usize) -> AppResult<Vec<ActivityRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, title, description, created_at, created_by
                FROM activities
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?1
            "#,
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| ActivityRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

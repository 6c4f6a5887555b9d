use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use super::{format_timestamp, format_timestamp_opt, parse_timestamp, parse_timestamp_opt};
use crate::error::{AppError, AppResult};
use crate::models::task::{TaskRecord, TaskStatus, TaskType};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        customer_id,
        assigned_rep_id,
        task_type,
        title,
        description,
        status,
        due_date,
        notes,
        created_by,
        created_at,
        completed_at
    FROM tasks
"#;

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub customer_id: String,
    pub assigned_rep_id: Option<String>,
    pub task_type: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub due_date: String,
    pub notes: String,
    pub created_by: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl TaskRow {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            customer_id: record.customer_id.clone(),
            assigned_rep_id: record.assigned_rep_id.clone(),
            task_type: record.task_type.as_str().to_string(),
            title: record.title.clone(),
            description: record.description.clone(),
            status: record.status.as_str().to_string(),
            due_date: format_timestamp(&record.due_date),
            notes: record.notes.clone(),
            created_by: record.created_by.clone(),
            created_at: format_timestamp(&record.created_at),
            completed_at: format_timestamp_opt(record.completed_at.as_ref()),
        }
    }

    pub fn into_record(self) -> AppResult<TaskRecord> {
        Ok(TaskRecord {
            id: self.id,
            customer_id: self.customer_id,
            assigned_rep_id: self.assigned_rep_id,
            task_type: TaskType::try_from(self.task_type.as_str()).map_err(AppError::database)?,
            title: self.title,
            description: self.description,
            status: TaskStatus::try_from(self.status.as_str()).map_err(AppError::database)?,
            due_date: parse_timestamp(&self.due_date)?,
            notes: self.notes,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at)?,
            completed_at: parse_timestamp_opt(self.completed_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TaskRow {
            id: row.get("id")?,
            customer_id: row.get("customer_id")?,
            assigned_rep_id: row.get("assigned_rep_id")?,
            task_type: row.get("task_type")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            due_date: row.get("due_date")?,
            notes: row.get("notes")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (
                    id,
                    customer_id,
                    assigned_rep_id,
                    task_type,
                    title,
                    description,
                    status,
                    due_date,
                    notes,
                    created_by,
                    created_at,
                    completed_at
                ) VALUES (
                    :id,
                    :customer_id,
                    :assigned_rep_id,
                    :task_type,
                    :title,
                    :description,
                    :status,
                    :due_date,
                    :notes,
                    :created_by,
                    :created_at,
                    :completed_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":customer_id": &row.customer_id,
                ":assigned_rep_id": &row.assigned_rep_id,
                ":task_type": &row.task_type,
                ":title": &row.title,
                ":description": &row.description,
                ":status": &row.status,
                ":due_date": &row.due_date,
                ":notes": &row.notes,
                ":created_by": &row.created_by,
                ":created_at": &row.created_at,
                ":completed_at": &row.completed_at,
            },
        )?;

        Ok(())
    }

    pub fn mark_completed(conn: &Connection, id: &str, completed_at: &str) -> AppResult<()> {
        let affected = conn.execute(
            "UPDATE tasks SET status = 'completed', completed_at = :completed_at WHERE id = :id",
            named_params! {":id": id, ":completed_at": completed_at},
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<TaskRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| TaskRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY due_date ASC", BASE_SELECT))?;
        let rows = stmt
            .query_map([], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_by_rep(conn: &Connection, rep_id: &str) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE assigned_rep_id = ?1 ORDER BY due_date ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([rep_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_by_customer(conn: &Connection, customer_id: &str) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE customer_id = ?1 ORDER BY due_date ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([customer_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::customer_repository::CustomerRepository;
use crate::db::repositories::format_timestamp;
use crate::db::repositories::rep_repository::RepRepository;
use crate::db::repositories::task_repository::{TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::context::{RequestContext, Scope};
use crate::models::effect::{Effect, Outcome};
use crate::models::task::{TaskCreateInput, TaskRecord, TaskStatus, TaskType, TaskUrgency};
use crate::services::{activity_service, customer_service};
use crate::utils::format::format_day;

pub const SYSTEM_ACTOR: &str = "system";

pub(crate) const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Fixed description text for a task type keyed by its raw name. Unknown
/// names describe as an empty string.
pub fn describe_task_type(raw: &str) -> &'static str {
    TaskType::try_from(raw)
        .map(|kind| kind.description())
        .unwrap_or("")
}

/// A system-authored follow-up, due a day from `now` unless told otherwise.
pub fn build_auto_task(
    customer_id: &str,
    rep_id: &str,
    task_type: TaskType,
    title: &str,
    due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> TaskRecord {
    TaskRecord {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        assigned_rep_id: Some(rep_id.to_string()),
        task_type,
        title: title.to_string(),
        description: task_type.description().to_string(),
        status: TaskStatus::NotStarted,
        due_date: due_date.unwrap_or_else(|| now + Duration::days(1)),
        notes: String::new(),
        created_by: SYSTEM_ACTOR.to_string(),
        created_at: now,
        completed_at: None,
    }
}

pub fn insert(conn: &Connection, task: &TaskRecord) -> AppResult<()> {
    TaskRepository::insert(conn, &TaskRow::from_record(task))?;
    info!(
        target: "crm::task",
        task_id = %task.id,
        customer_id = %task.customer_id,
        task_type = %task.task_type,
        "task created"
    );
    Ok(())
}

/// Whole days until the task is due, rounded up; negative once past due.
pub fn days_until_due(task: &TaskRecord, now: DateTime<Utc>) -> i64 {
    let millis = (task.due_date - now).num_milliseconds() as f64;
    (millis / MILLIS_PER_DAY).ceil() as i64
}

pub fn urgency(task: &TaskRecord, now: DateTime<Utc>) -> TaskUrgency {
    if task.is_completed() {
        return TaskUrgency::Normal;
    }
    if task.due_date < now {
        TaskUrgency::Overdue
    } else if days_until_due(task, now) <= 1 {
        TaskUrgency::Urgent
    } else {
        TaskUrgency::Normal
    }
}

/// Display order: earliest due date first.
pub fn sort_by_due(tasks: &mut [TaskRecord]) {
    tasks.sort_by(|a, b| a.due_date.cmp(&b.due_date));
}

#[derive(Clone)]
pub struct TaskService {
    db: DbPool,
}

impl TaskService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create_manual_task(
        &self,
        ctx: &RequestContext,
        input: TaskCreateInput,
    ) -> AppResult<Outcome<TaskRecord>> {
        let task = build_manual_task(ctx, input)?;

        let notifications = self.db.with_transaction(|conn| {
            if CustomerRepository::find_by_id(conn, &task.customer_id)?.is_none() {
                return Err(AppError::not_found());
            }
            let rep_id = task.assigned_rep_id.as_deref().unwrap_or_default();
            if RepRepository::find_by_id(conn, rep_id)?.is_none() {
                return Err(AppError::not_found());
            }

            insert(conn, &task)?;
            activity_service::apply_effects(
                conn,
                ctx,
                vec![Effect::notify(
                    rep_id,
                    "New task assigned",
                    format!(
                        "{} is due {}.\n{}",
                        task.title,
                        format_day(&task.due_date),
                        task.description
                    ),
                )],
            )
        })?;

        Ok(Outcome::new(task, notifications))
    }

    /// Completing twice rewrites `completed_at`. Reps may complete their own
    /// tasks and unassigned ones.
    pub fn complete_task(&self, ctx: &RequestContext, id: &str) -> AppResult<TaskRecord> {
        let completed_at = format_timestamp(&ctx.now);
        self.db.with_transaction(|conn| {
            let task = TaskRepository::find_by_id(conn, id)?
                .ok_or_else(AppError::not_found)?
                .into_record()?;
            if let Scope::Rep(rep_id) = ctx.scope() {
                if task
                    .assigned_rep_id
                    .as_deref()
                    .is_some_and(|assignee| assignee != rep_id)
                {
                    return Err(AppError::forbidden(format!(
                        "task {id} is assigned to another rep"
                    )));
                }
            }
            TaskRepository::mark_completed(conn, id, &completed_at)
        })?;
        info!(target: "crm::task", task_id = %id, actor = %ctx.actor_id(), "task completed");
        self.get_task(id)
    }

    pub fn get_task(&self, id: &str) -> AppResult<TaskRecord> {
        let row = self
            .db
            .with_connection(|conn| TaskRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?;
        let record = row.into_record()?;
        debug!(target: "crm::task", task_id = %record.id, "task fetched");
        Ok(record)
    }

    /// Tasks visible to the actor, earliest due first.
    pub fn list_tasks(&self, ctx: &RequestContext) -> AppResult<Vec<TaskRecord>> {
        let rows = self.db.with_connection(|conn| match ctx.scope() {
            Scope::All => TaskRepository::list_all(conn),
            Scope::Rep(rep_id) => TaskRepository::list_by_rep(conn, &rep_id),
        })?;
        let mut tasks = into_records(rows)?;
        sort_by_due(&mut tasks);
        debug!(target: "crm::task", count = tasks.len(), "tasks listed");
        Ok(tasks)
    }

    pub fn tasks_for_customer(
        &self,
        ctx: &RequestContext,
        customer_id: &str,
    ) -> AppResult<Vec<TaskRecord>> {
        let rows = self.db.with_connection(|conn| {
            let customer = customer_service::load_customer(conn, customer_id)?;
            customer_service::ensure_visible(ctx, &customer)?;
            TaskRepository::list_by_customer(conn, customer_id)
        })?;
        into_records(rows)
    }

    /// Open tasks due within a day (or overdue) that belong to the actor or
    /// to nobody.
    pub fn urgent_tasks(&self, ctx: &RequestContext) -> AppResult<Vec<TaskRecord>> {
        let rows = self.db.with_connection(TaskRepository::list_all)?;
        let mut tasks: Vec<TaskRecord> = into_records(rows)?
            .into_iter()
            .filter(|task| !task.is_completed())
            .filter(|task| {
                task.assigned_rep_id
                    .as_deref()
                    .map_or(true, |rep_id| rep_id == ctx.actor_id())
            })
            .filter(|task| days_until_due(task, ctx.now) <= 1)
            .collect();
        sort_by_due(&mut tasks);
        Ok(tasks)
    }
}

fn into_records(rows: Vec<TaskRow>) -> AppResult<Vec<TaskRecord>> {
    rows.into_iter()
        .map(|row| row.into_record())
        .collect::<AppResult<Vec<_>>>()
}

fn build_manual_task(ctx: &RequestContext, input: TaskCreateInput) -> AppResult<TaskRecord> {
    let customer_id = required(input.customer_id, "customer")?;
    let raw_type = required(input.task_type, "task type")?;
    let raw_due = required(input.due_date, "due date")?;
    let rep_id = required(input.assigned_rep_id, "assigned rep")?;

    let task_type = TaskType::try_from(raw_type.as_str()).map_err(AppError::validation)?;
    let due_date = parse_due_date(&raw_due)?;

    let title = normalize_optional(input.title).unwrap_or_else(|| task_type.label().to_string());
    let description = normalize_optional(input.description)
        .unwrap_or_else(|| describe_task_type(task_type.as_str()).to_string());

    Ok(TaskRecord {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id,
        assigned_rep_id: Some(rep_id),
        task_type,
        title,
        description,
        status: TaskStatus::NotStarted,
        due_date,
        notes: String::new(),
        created_by: ctx.actor_id().to_string(),
        created_at: ctx.now,
        completed_at: None,
    })
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    normalize_optional(value).ok_or_else(|| AppError::validation(format!("{field} is required")))
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_due_date(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Ok(value.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::validation("due date must be an RFC 3339 timestamp or YYYY-MM-DD"))
}

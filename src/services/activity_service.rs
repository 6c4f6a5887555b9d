use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::db::repositories::activity_repository::{ActivityRepository, ActivityRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::activity::ActivityRecord;
use crate::models::context::RequestContext;
use crate::models::effect::{Effect, Notification};

pub const DEFAULT_FEED_LIMIT: usize = 10;

/// Appends one entry to the audit trail on `conn`, which may be an open
/// transaction.
pub fn append(
    conn: &Connection,
    title: &str,
    description: &str,
    actor_id: &str,
    now: DateTime<Utc>,
) -> AppResult<ActivityRecord> {
    let title = title.trim();
    let description = description.trim();
    if title.is_empty() {
        return Err(AppError::validation("activity title cannot be empty"));
    }
    if description.is_empty() {
        return Err(AppError::validation("activity description cannot be empty"));
    }

    let record = ActivityRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: description.to_string(),
        created_at: now,
        created_by: actor_id.to_string(),
    };
    ActivityRepository::insert(conn, &ActivityRow::from_record(&record))?;
    debug!(target: "crm::activity", activity_id = %record.id, title = %record.title, "activity recorded");
    Ok(record)
}

/// Applies the effects that belong inside the write and returns the
/// notifications that must wait until it commits.
pub fn apply_effects(
    conn: &Connection,
    ctx: &RequestContext,
    effects: Vec<Effect>,
) -> AppResult<Vec<Notification>> {
    let mut pending = Vec::new();
    for effect in effects {
        match effect {
            Effect::RecordActivity { title, description } => {
                append(conn, &title, &description, ctx.actor_id(), ctx.now)?;
            }
            Effect::Notify(notification) => pending.push(notification),
        }
    }
    Ok(pending)
}

#[derive(Clone)]
pub struct ActivityService {
    db: DbPool,
    feed_limit: usize,
}

impl ActivityService {
    pub fn new(db: DbPool) -> Self {
        Self::with_feed_limit(db, DEFAULT_FEED_LIMIT)
    }

    pub fn with_feed_limit(db: DbPool, feed_limit: usize) -> Self {
        Self {
            db,
            feed_limit: feed_limit.max(1),
        }
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: Option<usize>) -> AppResult<Vec<ActivityRecord>> {
        let limit = limit.unwrap_or(self.feed_limit).max(1);
        let rows = self
            .db
            .with_connection(|conn| ActivityRepository::list_recent(conn, limit))?;
        rows.into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()
    }
}

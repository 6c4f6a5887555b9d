use tracing::{debug, info};

use crate::db::repositories::rep_repository::{RepRepository, RepRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::context::{RequestContext, Role};
use crate::models::effect::{Effect, Outcome};
use crate::models::rep::{RepCreateInput, RepRecord, RepStatus, UserCreateInput};
use crate::services::activity_service;

pub const UNKNOWN_REP_NAME: &str = "Unknown";

/// Splits a comma separated postcode list, dropping blanks.
pub fn parse_postcodes(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| code.to_uppercase())
        .collect()
}

#[derive(Clone)]
pub struct RepService {
    db: DbPool,
}

impl RepService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Registers a sales rep against an account the identity provider has
    /// already issued.
    pub fn add_rep(&self, ctx: &RequestContext, input: RepCreateInput) -> AppResult<Outcome<RepRecord>> {
        ensure_admin(ctx)?;
        let record = build_rep(ctx, input)?;

        let notifications = self.db.with_transaction(|conn| {
            RepRepository::insert(conn, &RepRow::from_record(&record)?)?;
            activity_service::apply_effects(
                conn,
                ctx,
                vec![Effect::activity(
                    format!("New rep added: {}", record.name),
                    format!("Region: {}", record.region.as_deref().unwrap_or_default()),
                )],
            )
        })?;

        info!(target: "crm::rep", rep_id = %record.id, region = ?record.region, "rep added");
        Ok(Outcome::new(record, notifications))
    }

    /// Creates an admin, owner or rep account without the rep territory
    /// fields.
    pub fn create_user(&self, ctx: &RequestContext, input: UserCreateInput) -> AppResult<Outcome<RepRecord>> {
        ensure_admin(ctx)?;
        let id = required(&input.id, "id")?;
        let name = required(&input.name, "name")?;
        let email = required(&input.email, "email")?;

        let record = RepRecord {
            id,
            name,
            email,
            mobile: None,
            region: None,
            postcodes: Vec::new(),
            max_travel_time: 0.0,
            max_travel_miles: 0.0,
            calendar_id: None,
            role: input.role,
            status: RepStatus::Active,
            created_by: ctx.actor_id().to_string(),
            created_at: ctx.now,
        };

        let notifications = self.db.with_transaction(|conn| {
            RepRepository::insert(conn, &RepRow::from_record(&record)?)?;
            activity_service::apply_effects(
                conn,
                ctx,
                vec![Effect::activity(
                    format!("New user added: {}", record.name),
                    format!("Role: {}", record.role),
                )],
            )
        })?;

        info!(target: "crm::rep", user_id = %record.id, role = %record.role, "user created");
        Ok(Outcome::new(record, notifications))
    }

    pub fn get_rep(&self, id: &str) -> AppResult<RepRecord> {
        self.db
            .with_connection(|conn| RepRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?
            .into_record()
    }

    /// Accounts with the `rep` role, for assignment pickers.
    pub fn list_reps(&self) -> AppResult<Vec<RepRecord>> {
        let rows = self
            .db
            .with_connection(|conn| RepRepository::list_by_role(conn, Role::Rep))?;
        let reps = rows
            .into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "crm::rep", count = reps.len(), "reps listed");
        Ok(reps)
    }

    pub fn list_users(&self, ctx: &RequestContext) -> AppResult<Vec<RepRecord>> {
        ensure_admin(ctx)?;
        let rows = self.db.with_connection(RepRepository::list_all)?;
        rows.into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()
    }

    /// Display name for a rep id; missing reps read as "Unknown".
    pub fn rep_name(&self, id: &str) -> AppResult<String> {
        let row = self
            .db
            .with_connection(|conn| RepRepository::find_by_id(conn, id))?;
        Ok(row
            .map(|row| row.name)
            .unwrap_or_else(|| UNKNOWN_REP_NAME.to_string()))
    }
}

fn ensure_admin(ctx: &RequestContext) -> AppResult<()> {
    if ctx.principal.role.sees_everything() {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "{} may not manage accounts",
            ctx.principal.role
        )))
    }
}

fn build_rep(ctx: &RequestContext, input: RepCreateInput) -> AppResult<RepRecord> {
    let id = required(&input.id, "id")?;
    let name = required(&input.name, "name")?;
    let email = required(&input.email, "email")?;
    let mobile = required(&input.mobile, "mobile")?;
    let region = required(&input.region, "region")?;

    let max_travel_time = non_negative(input.max_travel_time, "max travel time")?;
    let max_travel_miles = non_negative(input.max_travel_miles, "max travel miles")?;

    Ok(RepRecord {
        id,
        name,
        email,
        mobile: Some(mobile),
        region: Some(region),
        postcodes: parse_postcodes(input.postcodes.as_deref()),
        max_travel_time,
        max_travel_miles,
        calendar_id: input
            .calendar_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
        role: Role::Rep,
        status: RepStatus::Active,
        created_by: ctx.actor_id().to_string(),
        created_at: ctx.now,
    })
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn non_negative(value: Option<f64>, field: &str) -> AppResult<f64> {
    match value {
        None => Ok(0.0),
        Some(number) if number.is_finite() && number >= 0.0 => Ok(number),
        Some(_) => Err(AppError::validation(format!(
            "{field} must be a non-negative number"
        ))),
    }
}

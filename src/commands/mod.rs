pub mod commissions;
pub mod customers;
pub mod dashboard;
pub mod reps;
pub mod tasks;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::effect::Outcome;
use crate::services::activity_service::ActivityService;
use crate::services::commission_service::CommissionService;
use crate::services::customer_service::CustomerService;
use crate::services::metrics_service::MetricsService;
use crate::services::notification_service::NotificationDispatcher;
use crate::services::rep_service::RepService;
use crate::services::task_service::TaskService;

#[derive(Clone)]
pub struct AppState {
    customer_service: Arc<CustomerService>,
    task_service: Arc<TaskService>,
    commission_service: Arc<CommissionService>,
    activity_service: Arc<ActivityService>,
    metrics_service: Arc<MetricsService>,
    rep_service: Arc<RepService>,
    dispatcher: NotificationDispatcher,
}

impl AppState {
    pub fn new(db_pool: DbPool, dispatcher: NotificationDispatcher, feed_limit: usize) -> Self {
        let customer_service = CustomerService::new(db_pool.clone());
        let metrics_service = Arc::new(MetricsService::new(customer_service.clone()));

        Self {
            customer_service: Arc::new(customer_service),
            task_service: Arc::new(TaskService::new(db_pool.clone())),
            commission_service: Arc::new(CommissionService::new(db_pool.clone())),
            activity_service: Arc::new(ActivityService::with_feed_limit(
                db_pool.clone(),
                feed_limit,
            )),
            metrics_service,
            rep_service: Arc::new(RepService::new(db_pool.clone())),
            dispatcher,
        }
    }

    pub fn customers(&self) -> Arc<CustomerService> {
        Arc::clone(&self.customer_service)
    }

    pub fn tasks(&self) -> Arc<TaskService> {
        Arc::clone(&self.task_service)
    }

    pub fn commissions(&self) -> Arc<CommissionService> {
        Arc::clone(&self.commission_service)
    }

    pub fn activities(&self) -> Arc<ActivityService> {
        Arc::clone(&self.activity_service)
    }

    pub fn metrics(&self) -> Arc<MetricsService> {
        Arc::clone(&self.metrics_service)
    }

    pub fn reps(&self) -> Arc<RepService> {
        Arc::clone(&self.rep_service)
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "the requested record does not exist", None)
            }
            AppError::InvalidAmount { amount } => CommandError::new(
                "INVALID_AMOUNT",
                format!("amount must be a positive number, got {amount}"),
                Some(serde_json::json!({ "amount": amount })),
            ),
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Forbidden { message } => {
                warn!(target: "crm::command", %message, "forbidden command");
                CommandError::new("FORBIDDEN", message, None)
            }
            AppError::Database { message } => {
                error!(target: "crm::command", %message, "database error in command");
                CommandError::new("PERSISTENCE_ERROR", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "crm::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "crm::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "crm::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Runs synchronous SQLite work off the async executor.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("background task failed: {err}"), None))?
        .map_err(CommandError::from)
}

/// Like `run_blocking`, then hands the committed operation's notifications
/// to the dispatcher without waiting for delivery.
pub(crate) async fn run_with_effects<T: Send + 'static>(
    state: &AppState,
    task: impl FnOnce() -> Result<Outcome<T>, AppError> + Send + 'static,
) -> CommandResult<T> {
    let (value, notifications) = run_blocking(task).await?.into_parts();
    state.dispatcher().dispatch(notifications);
    Ok(value)
}

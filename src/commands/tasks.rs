use serde::Serialize;

use crate::models::context::RequestContext;
use crate::models::task::{TaskCreateInput, TaskRecord, TaskUrgency};
use crate::services::task_service::{days_until_due, describe_task_type, urgency};

use super::{run_blocking, run_with_effects, AppState, CommandResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    #[serde(flatten)]
    pub task: TaskRecord,
    pub urgency: TaskUrgency,
    pub days_until_due: i64,
}

fn decorate(tasks: Vec<TaskRecord>, ctx: &RequestContext) -> Vec<TaskListItem> {
    tasks
        .into_iter()
        .map(|task| TaskListItem {
            urgency: urgency(&task, ctx.now),
            days_until_due: days_until_due(&task, ctx.now),
            task,
        })
        .collect()
}

pub async fn tasks_create(
    state: &AppState,
    ctx: RequestContext,
    payload: TaskCreateInput,
) -> CommandResult<TaskRecord> {
    let service = state.tasks();
    run_with_effects(state, move || service.create_manual_task(&ctx, payload)).await
}

pub async fn tasks_complete(
    state: &AppState,
    ctx: RequestContext,
    id: String,
) -> CommandResult<TaskRecord> {
    let service = state.tasks();
    run_blocking(move || service.complete_task(&ctx, &id)).await
}

pub async fn tasks_list(state: &AppState, ctx: RequestContext) -> CommandResult<Vec<TaskListItem>> {
    let service = state.tasks();
    let list_ctx = ctx.clone();
    let tasks = run_blocking(move || service.list_tasks(&list_ctx)).await?;
    Ok(decorate(tasks, &ctx))
}

/// Dashboard widget: the actor's open tasks due within a day.
pub async fn tasks_urgent(
    state: &AppState,
    ctx: RequestContext,
) -> CommandResult<Vec<TaskListItem>> {
    let service = state.tasks();
    let list_ctx = ctx.clone();
    let tasks = run_blocking(move || service.urgent_tasks(&list_ctx)).await?;
    Ok(decorate(tasks, &ctx))
}

pub async fn tasks_for_customer(
    state: &AppState,
    ctx: RequestContext,
    customer_id: String,
) -> CommandResult<Vec<TaskListItem>> {
    let service = state.tasks();
    let lookup_ctx = ctx.clone();
    let tasks =
        run_blocking(move || service.tasks_for_customer(&lookup_ctx, &customer_id)).await?;
    Ok(decorate(tasks, &ctx))
}

/// Prefill text for the manual task form.
pub fn tasks_describe_type(task_type: &str) -> &'static str {
    describe_task_type(task_type)
}

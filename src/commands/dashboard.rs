use crate::models::activity::ActivityRecord;
use crate::models::context::RequestContext;
use crate::models::metrics::DashboardMetrics;

use super::{run_blocking, AppState, CommandResult};

pub async fn dashboard_metrics(
    state: &AppState,
    ctx: RequestContext,
) -> CommandResult<DashboardMetrics> {
    let service = state.metrics();
    run_blocking(move || service.dashboard(&ctx)).await
}

pub async fn activity_feed(
    state: &AppState,
    limit: Option<usize>,
) -> CommandResult<Vec<ActivityRecord>> {
    let service = state.activities();
    run_blocking(move || service.recent(limit)).await
}

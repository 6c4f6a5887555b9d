use crate::models::context::RequestContext;
use crate::models::rep::{RepCreateInput, RepRecord, UserCreateInput};

use super::{run_blocking, run_with_effects, AppState, CommandResult};

pub async fn reps_add(
    state: &AppState,
    ctx: RequestContext,
    payload: RepCreateInput,
) -> CommandResult<RepRecord> {
    let service = state.reps();
    run_with_effects(state, move || service.add_rep(&ctx, payload)).await
}

pub async fn users_create(
    state: &AppState,
    ctx: RequestContext,
    payload: UserCreateInput,
) -> CommandResult<RepRecord> {
    let service = state.reps();
    run_with_effects(state, move || service.create_user(&ctx, payload)).await
}

pub async fn reps_list(state: &AppState) -> CommandResult<Vec<RepRecord>> {
    let service = state.reps();
    run_blocking(move || service.list_reps()).await
}

pub async fn users_list(state: &AppState, ctx: RequestContext) -> CommandResult<Vec<RepRecord>> {
    let service = state.reps();
    run_blocking(move || service.list_users(&ctx)).await
}

pub async fn reps_get(state: &AppState, id: String) -> CommandResult<RepRecord> {
    let service = state.reps();
    run_blocking(move || service.get_rep(&id)).await
}

pub async fn reps_name(state: &AppState, id: String) -> CommandResult<String> {
    let service = state.reps();
    run_blocking(move || service.rep_name(&id)).await
}

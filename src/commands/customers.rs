use serde::Serialize;
use tracing::debug;

use crate::error::AppError;
use crate::models::commission::CommissionRecord;
use crate::models::context::RequestContext;
use crate::models::customer::{CustomerCreateInput, CustomerFilter, CustomerRecord, CustomerStatus, Staleness};
use crate::services::customer_service::staleness;
use crate::services::estimation;

use super::{run_blocking, run_with_effects, AppState, CommandResult};

/// A customer row as the pipeline table shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListItem {
    #[serde(flatten)]
    pub customer: CustomerRecord,
    pub status_label: &'static str,
    pub staleness: Staleness,
}

impl CustomerListItem {
    fn from_record(customer: CustomerRecord, ctx: &RequestContext) -> Self {
        Self {
            status_label: customer.status.label(),
            staleness: staleness(&customer, ctx.now),
            customer,
        }
    }
}

pub async fn customers_create(
    state: &AppState,
    ctx: RequestContext,
    payload: CustomerCreateInput,
) -> CommandResult<CustomerRecord> {
    let service = state.customers();
    run_with_effects(state, move || service.create_customer(&ctx, payload)).await
}

pub async fn customers_list(
    state: &AppState,
    ctx: RequestContext,
    filter: Option<CustomerFilter>,
) -> CommandResult<Vec<CustomerListItem>> {
    let service = state.customers();
    let filter = filter.unwrap_or_default();
    let list_ctx = ctx.clone();
    let records = run_blocking(move || service.search(&list_ctx, &filter)).await?;
    debug!(target: "crm::command", count = records.len(), "customers listed");
    Ok(records
        .into_iter()
        .map(|record| CustomerListItem::from_record(record, &ctx))
        .collect())
}

pub async fn customers_get(
    state: &AppState,
    ctx: RequestContext,
    id: String,
) -> CommandResult<CustomerListItem> {
    let service = state.customers();
    let lookup_ctx = ctx.clone();
    let record = run_blocking(move || service.get_customer(&lookup_ctx, &id)).await?;
    Ok(CustomerListItem::from_record(record, &ctx))
}

pub async fn customers_mark_sold(
    state: &AppState,
    ctx: RequestContext,
    id: String,
    deposit_amount: f64,
) -> CommandResult<CommissionRecord> {
    let service = state.customers();
    run_with_effects(state, move || service.mark_sold(&ctx, &id, deposit_amount)).await
}

pub async fn customers_mark_installed(
    state: &AppState,
    ctx: RequestContext,
    id: String,
) -> CommandResult<Vec<CommissionRecord>> {
    let service = state.customers();
    run_with_effects(state, move || service.mark_installed(&ctx, &id)).await
}

pub async fn customers_advance_status(
    state: &AppState,
    ctx: RequestContext,
    id: String,
    status: String,
) -> CommandResult<CustomerRecord> {
    let status = CustomerStatus::try_from(status.as_str()).map_err(AppError::validation)?;
    let service = state.customers();
    run_with_effects(state, move || service.advance_status(&ctx, &id, status)).await
}

pub async fn customers_record_contact(
    state: &AppState,
    ctx: RequestContext,
    id: String,
) -> CommandResult<CustomerRecord> {
    let service = state.customers();
    run_blocking(move || service.record_contact(&ctx, &id)).await
}

pub async fn customers_assign_rep(
    state: &AppState,
    ctx: RequestContext,
    id: String,
    rep_id: String,
) -> CommandResult<CustomerRecord> {
    let service = state.customers();
    run_with_effects(state, move || service.assign_rep(&ctx, &id, &rep_id)).await
}

/// Price preview for the new-customer form.
pub fn customers_estimate(installation_type: &str) -> f64 {
    estimation::estimated_value_for(installation_type)
}

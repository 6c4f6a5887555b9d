use serde::Serialize;

use crate::models::commission::{CommissionRecord, CommissionRollup, CommissionStage};
use crate::models::context::RequestContext;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionListItem {
    #[serde(flatten)]
    pub commission: CommissionRecord,
    pub stage: CommissionStage,
    pub stage_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionLedgerResponse {
    pub items: Vec<CommissionListItem>,
    pub rollup: CommissionRollup,
}

fn decorate(commissions: Vec<CommissionRecord>) -> Vec<CommissionListItem> {
    commissions
        .into_iter()
        .map(|commission| {
            let stage = CommissionStage::of(&commission);
            CommissionListItem {
                stage,
                stage_label: stage.label(),
                commission,
            }
        })
        .collect()
}

pub async fn commissions_list(
    state: &AppState,
    ctx: RequestContext,
) -> CommandResult<CommissionLedgerResponse> {
    let service = state.commissions();
    let ledger = run_blocking(move || service.ledger(&ctx)).await?;
    Ok(CommissionLedgerResponse {
        items: decorate(ledger.items),
        rollup: ledger.rollup,
    })
}

pub async fn commissions_for_customer(
    state: &AppState,
    ctx: RequestContext,
    customer_id: String,
) -> CommandResult<Vec<CommissionListItem>> {
    let service = state.commissions();
    let commissions = run_blocking(move || service.for_customer(&ctx, &customer_id)).await?;
    Ok(decorate(commissions))
}

pub async fn commissions_get(
    state: &AppState,
    ctx: RequestContext,
    id: String,
) -> CommandResult<CommissionListItem> {
    let service = state.commissions();
    let commission = run_blocking(move || service.get(&ctx, &id)).await?;
    Ok(decorate(vec![commission]).remove(0))
}

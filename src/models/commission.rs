use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRecord {
    pub id: String,
    pub customer_id: String,
    pub rep_id: Option<String>,
    pub total_sale_price: f64,
    pub commission_amount: f64,
    pub deposit_commission: f64,
    pub final_commission: f64,
    pub deposit_paid: bool,
    pub deposit_paid_date: Option<DateTime<Utc>>,
    pub final_paid: bool,
    pub final_paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStage {
    AwaitingDeposit,
    AwaitingInstallation,
    Complete,
}

impl CommissionStage {
    pub fn of(commission: &CommissionRecord) -> Self {
        if !commission.deposit_paid {
            CommissionStage::AwaitingDeposit
        } else if !commission.final_paid {
            CommissionStage::AwaitingInstallation
        } else {
            CommissionStage::Complete
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CommissionStage::AwaitingDeposit => "Awaiting Deposit",
            CommissionStage::AwaitingInstallation => "Awaiting Installation",
            CommissionStage::Complete => "Complete",
        }
    }
}

impl fmt::Display for CommissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRollup {
    pub total: f64,
    pub pending: f64,
    pub completed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommissionLedger {
    pub items: Vec<CommissionRecord>,
    pub rollup: CommissionRollup,
}

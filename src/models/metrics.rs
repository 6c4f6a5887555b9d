use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_customers: usize,
    pub my_customers: usize,
    pub pipeline_value: f64,
    /// Whole percent, 0..=100.
    pub conversion_rate: u32,
}

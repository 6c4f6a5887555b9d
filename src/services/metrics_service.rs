use tracing::debug;

use crate::error::AppResult;
use crate::models::context::RequestContext;
use crate::models::customer::{CustomerRecord, CustomerStatus};
use crate::models::metrics::DashboardMetrics;
use crate::services::customer_service::CustomerService;

/// Estimated value still in play: everything not yet sold or lost.
/// Installed customers still count.
pub fn pipeline_value(customers: &[CustomerRecord]) -> f64 {
    customers
        .iter()
        .filter(|customer| {
            !matches!(
                customer.status,
                CustomerStatus::Sold | CustomerStatus::NotSold
            )
        })
        .map(|customer| customer.estimated_value)
        .sum()
}

/// Share of customers currently in `sold`, as a rounded whole percent.
pub fn conversion_rate(customers: &[CustomerRecord]) -> u32 {
    if customers.is_empty() {
        return 0;
    }
    let sold = customers
        .iter()
        .filter(|customer| customer.status == CustomerStatus::Sold)
        .count();
    (100.0 * sold as f64 / customers.len() as f64).round() as u32
}

pub fn summarize(customers: &[CustomerRecord]) -> DashboardMetrics {
    DashboardMetrics {
        total_customers: customers.len(),
        // Admin dashboards treat the whole book as their own.
        my_customers: customers.len(),
        pipeline_value: pipeline_value(customers),
        conversion_rate: conversion_rate(customers),
    }
}

#[derive(Clone)]
pub struct MetricsService {
    customers: CustomerService,
}

impl MetricsService {
    pub fn new(customers: CustomerService) -> Self {
        Self { customers }
    }

    /// Headline numbers over the customers the actor can see.
    pub fn dashboard(&self, ctx: &RequestContext) -> AppResult<DashboardMetrics> {
        let customers = self.customers.list_customers(ctx)?;
        let metrics = summarize(&customers);
        debug!(
            target: "crm::metrics",
            actor = %ctx.actor_id(),
            total = metrics.total_customers,
            pipeline = metrics.pipeline_value,
            conversion = metrics.conversion_rate,
            "dashboard computed"
        );
        Ok(metrics)
    }
}

pub mod activity;
pub mod commission;
pub mod context;
pub mod customer;
pub mod effect;
pub mod metrics;
pub mod rep;
pub mod task;

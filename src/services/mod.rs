pub mod activity_service;
pub mod commission_service;
pub mod customer_service;
pub mod estimation;
pub mod metrics_service;
pub mod notification_service;
pub mod rep_service;
pub mod task_service;

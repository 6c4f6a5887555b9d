pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use tracing::info;

use crate::commands::AppState;
use crate::config::CrmConfig;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::notification_service::{NotificationDispatcher, WebhookNotifier};

/// Wires logging, the database and the notification channel into an
/// `AppState` the presentation layer can call into.
pub fn bootstrap(config: &CrmConfig) -> AppResult<AppState> {
    utils::logger::init_logging(&config.log_dir)?;
    build_state(config)
}

/// Same as `bootstrap` without touching the global subscriber.
pub fn build_state(config: &CrmConfig) -> AppResult<AppState> {
    let pool = DbPool::new(&config.db_path)?;

    let dispatcher = match config.notify_webhook_url.as_deref() {
        Some(url) => {
            let notifier = WebhookNotifier::new(url, config.notify_timeout)?;
            info!(target: "crm::notify", endpoint = %notifier.endpoint(), "webhook notifications enabled");
            NotificationDispatcher::new(Arc::new(notifier))
        }
        None => NotificationDispatcher::tracing(),
    };

    info!(
        target: "crm::db",
        db_path = %pool.path().display(),
        feed_limit = config.activity_feed_limit,
        "crm core ready"
    );
    Ok(AppState::new(pool, dispatcher, config.activity_feed_limit))
}

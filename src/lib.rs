pub mod commands;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod logging;
pub mod state;

use commands::{
    dashboard::{start_auto_refresh, stop_auto_refresh},
    live_stream::{start_live_stream, stop_live_stream},
};
use config::DashboardArgs;
use dashboard::notifications::NotificationLog;
use db::{initialize_pool_from_path, resolve_db_path};
use error::AppError;
use state::AppState;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run() -> Result<(), AppError> {
    logging::init();

    let config = DashboardArgs::from_env()?.normalize()?;
    let db_path = resolve_db_path(config.db_path.as_deref());
    let db_pool = initialize_pool_from_path(&db_path).await?;
    info!(
        db = %db_path.display(),
        channel = config.channel.mode.as_str(),
        refresh_interval_ms = config.refresh_interval_ms,
        "dashboard starting"
    );

    let state = AppState::new(db_pool, config).await;
    let notifier_cancel = CancellationToken::new();
    let notifier = spawn_notification_logger(
        Arc::clone(&state.notifications),
        notifier_cancel.clone(),
    );

    start_auto_refresh(&state).await?;
    start_live_stream(&state).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    stop_live_stream(&state).await?;
    stop_auto_refresh(&state).await?;
    notifier_cancel.cancel();
    if let Err(error) = notifier.await {
        warn!(%error, "notification logger ended abnormally");
    }
    state.db_pool.close().await;

    info!("dashboard stopped");
    Ok(())
}

fn spawn_notification_logger(
    log: Arc<NotificationLog>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut revisions = log.subscribe();
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                changed = revisions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            let current = log.list();
            for notification in current.iter().rev() {
                if seen.insert(notification.id.clone()) {
                    info!(
                        kind = ?notification.kind,
                        title = %notification.title,
                        message = %notification.message,
                        "notification"
                    );
                }
            }
            seen.retain(|id| current.iter().any(|entry| &entry.id == id));
        }
    })
}

use crate::dashboard::types::Notification;
use crate::error::AppError;
use crate::state::AppState;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

pub async fn notifications_list(state: &AppState) -> Result<NotificationsSnapshot, AppError> {
    let notifications = state.notifications.list();
    let unread_count = notifications.iter().filter(|entry| !entry.read).count();
    Ok(NotificationsSnapshot {
        notifications,
        unread_count,
    })
}

pub async fn notification_mark_read(state: &AppState, id: &str) -> Result<bool, AppError> {
    Ok(state.notifications.mark_read(id.trim()))
}

pub async fn notifications_mark_all_read(
    state: &AppState,
) -> Result<NotificationsSnapshot, AppError> {
    state.notifications.mark_all_read();
    notifications_list(state).await
}

pub async fn notifications_clear(state: &AppState) -> Result<NotificationsSnapshot, AppError> {
    state.notifications.clear();
    notifications_list(state).await
}

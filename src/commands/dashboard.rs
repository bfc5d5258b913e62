use crate::commands::favorites::{favorites_get, FavoritesSnapshot};
use crate::dashboard::pipeline::{refresh_all, RefreshSummary};
use crate::dashboard::types::{
    AssetSnapshot, CitySnapshot, ConnectionStatusSnapshot, DataDomain, DomainStatus, NewsArticle,
};
use crate::error::AppError;
use crate::state::AppState;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainView<T> {
    pub items: Vec<T>,
    pub status: DomainStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub assets: DomainView<AssetSnapshot>,
    pub cities: DomainView<CitySnapshot>,
    pub news: DomainView<NewsArticle>,
    pub favorites: FavoritesSnapshot,
    pub unread_notifications: usize,
    pub connection: ConnectionStatusSnapshot,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutoRefreshStatus {
    pub running: bool,
    pub interval_ms: u64,
}

pub async fn dashboard_snapshot(state: &AppState) -> Result<DashboardSnapshot, AppError> {
    let store = &state.store;
    Ok(DashboardSnapshot {
        assets: DomainView {
            items: store.assets(),
            status: store.status(DataDomain::Assets),
        },
        cities: DomainView {
            items: store.cities(),
            status: store.status(DataDomain::Cities),
        },
        news: DomainView {
            items: store.news(),
            status: store.status(DataDomain::News),
        },
        favorites: favorites_get(state).await?,
        unread_notifications: state.notifications.unread_count(),
        connection: state.connection.status().await,
    })
}

pub async fn dashboard_refresh_now(state: &AppState) -> Result<RefreshSummary, AppError> {
    Ok(refresh_all(state.sources.as_ref(), &state.store).await)
}

pub async fn start_auto_refresh(state: &AppState) -> Result<AutoRefreshStatus, AppError> {
    let interval_ms = state.config.refresh_interval_ms;
    let sources = Arc::clone(&state.sources);
    let store = Arc::clone(&state.store);

    state
        .scheduler
        .start(Duration::from_millis(interval_ms), move || {
            let sources = Arc::clone(&sources);
            let store = Arc::clone(&store);
            async move {
                refresh_all(sources.as_ref(), &store).await;
            }
        })
        .await;

    Ok(AutoRefreshStatus {
        running: true,
        interval_ms,
    })
}

pub async fn stop_auto_refresh(state: &AppState) -> Result<AutoRefreshStatus, AppError> {
    state.scheduler.stop().await;
    Ok(AutoRefreshStatus {
        running: false,
        interval_ms: state.config.refresh_interval_ms,
    })
}

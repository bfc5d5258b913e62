use crate::config::{DashboardConfig, DataSourceKind};
use crate::dashboard::alerts::AlertEngine;
use crate::dashboard::connection::{ConnectionHandle, ConnectionManager};
use crate::dashboard::favorites::FavoritesStore;
use crate::dashboard::notifications::NotificationLog;
use crate::dashboard::pipeline::EventDispatcher;
use crate::dashboard::scheduler::RefreshScheduler;
use crate::dashboard::sources::{DataSource, HttpDataSource, MockDataSource};
use crate::dashboard::store::DashboardStore;
use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct AppState {
    pub started_at: Instant,
    pub db_pool: SqlitePool,
    pub config: DashboardConfig,
    pub store: Arc<DashboardStore>,
    pub notifications: Arc<NotificationLog>,
    pub alerts: Arc<AlertEngine>,
    pub favorites: FavoritesStore,
    pub connection: ConnectionManager,
    pub live_stream: Mutex<Option<ConnectionHandle>>,
    pub scheduler: RefreshScheduler,
    pub sources: Arc<dyn DataSource>,
}

impl AppState {
    pub async fn new(db_pool: SqlitePool, config: DashboardConfig) -> Self {
        let sources: Arc<dyn DataSource> = match &config.data_source {
            DataSourceKind::Mock { latency_ms } => {
                Arc::new(MockDataSource::new(Duration::from_millis(*latency_ms)))
            }
            DataSourceKind::Http { base_url } => {
                Arc::new(HttpDataSource::new(Client::new(), base_url))
            }
        };
        Self::with_source(db_pool, config, sources).await
    }

    pub async fn with_source(
        db_pool: SqlitePool,
        config: DashboardConfig,
        sources: Arc<dyn DataSource>,
    ) -> Self {
        let store = Arc::new(DashboardStore::new());
        let notifications = Arc::new(NotificationLog::new());
        let alerts = Arc::new(AlertEngine::new(
            config.alert_policy,
            Arc::clone(&notifications),
        ));
        let favorites = FavoritesStore::load(db_pool.clone()).await;
        let connection = ConnectionManager::new(config.channel.clone());

        Self {
            started_at: Instant::now(),
            db_pool,
            config,
            store,
            notifications,
            alerts,
            favorites,
            connection,
            live_stream: Mutex::new(None),
            scheduler: RefreshScheduler::new(),
            sources,
        }
    }

    pub fn dispatcher(&self) -> Arc<EventDispatcher> {
        Arc::new(EventDispatcher::new(
            Arc::clone(&self.store),
            Arc::clone(&self.alerts),
        ))
    }
}

use crate::dashboard::persistence::{load_string_list, save_string_list};
use crate::dashboard::types::FavoriteKind;
use sqlx::SqlitePool;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct FavoriteSets {
    cities: Vec<String>,
    assets: Vec<String>,
}

impl FavoriteSets {
    fn ids(&self, kind: FavoriteKind) -> &Vec<String> {
        match kind {
            FavoriteKind::City => &self.cities,
            FavoriteKind::Asset => &self.assets,
        }
    }

    fn ids_mut(&mut self, kind: FavoriteKind) -> &mut Vec<String> {
        match kind {
            FavoriteKind::City => &mut self.cities,
            FavoriteKind::Asset => &mut self.assets,
        }
    }
}

#[derive(Debug)]
pub struct FavoritesStore {
    pool: SqlitePool,
    sets: Mutex<FavoriteSets>,
    revision: watch::Sender<u64>,
}

impl FavoritesStore {
    pub async fn load(pool: SqlitePool) -> Self {
        let cities = load_kind(&pool, FavoriteKind::City).await;
        let assets = load_kind(&pool, FavoriteKind::Asset).await;
        info!(
            cities = cities.len(),
            assets = assets.len(),
            "favorites loaded"
        );

        let (revision, _) = watch::channel(0);
        Self {
            pool,
            sets: Mutex::new(FavoriteSets { cities, assets }),
            revision,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Flips membership of `id` and persists the whole set for `kind` before
    /// returning. A failed write is logged; the in-memory toggle still holds.
    pub async fn toggle(&self, kind: FavoriteKind, id: &str) -> bool {
        let mut writable = self.sets.lock().await;
        let ids = writable.ids_mut(kind);
        let favorited = match ids.iter().position(|existing| existing == id) {
            Some(index) => {
                ids.remove(index);
                false
            }
            None => {
                ids.push(id.to_string());
                true
            }
        };

        // The guard is held across the write so persisted sets land in toggle order.
        if let Err(error) = save_string_list(&self.pool, kind.storage_key(), ids).await {
            warn!(
                key = kind.storage_key(),
                %error,
                "failed to persist favorites; keeping in-memory state"
            );
        }
        drop(writable);

        self.revision
            .send_modify(|revision| *revision = revision.wrapping_add(1));
        favorited
    }

    pub async fn is_favorite(&self, kind: FavoriteKind, id: &str) -> bool {
        self.sets
            .lock()
            .await
            .ids(kind)
            .iter()
            .any(|existing| existing == id)
    }

    pub async fn list(&self, kind: FavoriteKind) -> Vec<String> {
        self.sets.lock().await.ids(kind).clone()
    }
}

async fn load_kind(pool: &SqlitePool, kind: FavoriteKind) -> Vec<String> {
    match load_string_list(pool, kind.storage_key()).await {
        Ok(Some(mut ids)) => {
            let mut seen = std::collections::HashSet::new();
            ids.retain(|id| seen.insert(id.clone()));
            ids
        }
        Ok(None) => Vec::new(),
        Err(error) => {
            warn!(
                key = kind.storage_key(),
                %error,
                "failed to load favorites; starting empty"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{initialize_pool_from_path, unique_db_path};
    use std::path::PathBuf;

    async fn fresh_pool() -> (SqlitePool, PathBuf) {
        let db_path = unique_db_path();
        let pool = initialize_pool_from_path(&db_path)
            .await
            .expect("pool initialization should succeed");
        (pool, db_path)
    }

    #[tokio::test]
    async fn absent_keys_load_as_empty_sets() {
        let (pool, db_path) = fresh_pool().await;

        let store = FavoritesStore::load(pool.clone()).await;

        assert!(store.list(FavoriteKind::City).await.is_empty());
        assert!(store.list(FavoriteKind::Asset).await.is_empty());
        pool.close().await;
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn toggle_is_an_involution() {
        let (pool, db_path) = fresh_pool().await;
        let store = FavoritesStore::load(pool.clone()).await;

        for round in 1..=5 {
            let favorited = store.toggle(FavoriteKind::Asset, "bitcoin").await;
            assert_eq!(favorited, round % 2 == 1);
            assert_eq!(
                store.is_favorite(FavoriteKind::Asset, "bitcoin").await,
                round % 2 == 1
            );
        }
        assert!(!store.is_favorite(FavoriteKind::City, "bitcoin").await);

        pool.close().await;
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn favorites_survive_reload() {
        let (pool, db_path) = fresh_pool().await;
        {
            let store = FavoritesStore::load(pool.clone()).await;
            store.toggle(FavoriteKind::City, "London").await;
            store.toggle(FavoriteKind::City, "Tokyo").await;
            store.toggle(FavoriteKind::Asset, "cardano").await;
            store.toggle(FavoriteKind::City, "London").await;
        }

        let reloaded = FavoritesStore::load(pool.clone()).await;

        assert_eq!(
            reloaded.list(FavoriteKind::City).await,
            vec!["Tokyo".to_string()]
        );
        assert_eq!(
            reloaded.list(FavoriteKind::Asset).await,
            vec!["cardano".to_string()]
        );
        let raw = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind("favoriteCryptos")
            .fetch_one(&pool)
            .await
            .expect("favoriteCryptos row should exist");
        assert_eq!(raw, r#"["cardano"]"#);

        pool.close().await;
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn toggle_succeeds_in_memory_when_storage_is_unavailable() {
        let (pool, db_path) = fresh_pool().await;
        let store = FavoritesStore::load(pool.clone()).await;
        pool.close().await;

        let favorited = store.toggle(FavoriteKind::City, "New York").await;

        assert!(favorited);
        assert!(store.is_favorite(FavoriteKind::City, "New York").await);
        let _ = std::fs::remove_file(db_path);
    }

    #[tokio::test]
    async fn toggles_bump_revision() {
        let (pool, db_path) = fresh_pool().await;
        let store = FavoritesStore::load(pool.clone()).await;
        let receiver = store.subscribe();

        store.toggle(FavoriteKind::Asset, "ethereum").await;

        assert_eq!(*receiver.borrow(), 1);
        pool.close().await;
        let _ = std::fs::remove_file(db_path);
    }
}

use crate::dashboard::types::{
    AssetDetail, AssetSnapshot, CitySnapshot, DataDomain, DomainStatus, NewsArticle, PricePoint,
    PriceUpdate, WeatherSample,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::watch;

// keyed by id, listed in first-seen order
#[derive(Debug)]
struct EntityTable<T> {
    entries: HashMap<String, T>,
    order: Vec<String>,
    status: DomainStatus,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            status: DomainStatus::default(),
        }
    }
}

impl<T: Clone> EntityTable<T> {
    fn upsert(&mut self, key: String, value: T) -> Option<T> {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, value)
    }

    fn get(&self, key: &str) -> Option<T> {
        self.entries.get(key).cloned()
    }

    fn list(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect()
    }
}

#[derive(Debug, Default)]
struct NewsFeed {
    articles: Vec<NewsArticle>,
    status: DomainStatus,
}

// One lock per domain: no cross-domain atomicity, writers win in arrival order.
#[derive(Debug)]
pub struct DashboardStore {
    assets: RwLock<EntityTable<AssetSnapshot>>,
    cities: RwLock<EntityTable<CitySnapshot>>,
    news: RwLock<NewsFeed>,
    asset_details: RwLock<HashMap<String, AssetDetail>>,
    asset_history: RwLock<HashMap<String, Vec<PricePoint>>>,
    city_history: RwLock<HashMap<String, Vec<WeatherSample>>>,
    revision: watch::Sender<u64>,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            assets: RwLock::new(EntityTable::default()),
            cities: RwLock::new(EntityTable::default()),
            news: RwLock::new(NewsFeed::default()),
            asset_details: RwLock::new(HashMap::new()),
            asset_history: RwLock::new(HashMap::new()),
            city_history: RwLock::new(HashMap::new()),
            revision,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    pub fn apply_pull_assets(&self, batch: Vec<AssetSnapshot>, now_ms: i64) {
        {
            let mut writable = self.assets.write();
            for snapshot in batch {
                writable.upsert(snapshot.id.clone(), snapshot);
            }
            mark_refreshed(&mut writable.status, now_ms);
        }
        self.bump();
    }

    pub fn apply_pull_cities(&self, batch: Vec<CitySnapshot>, now_ms: i64) {
        {
            let mut writable = self.cities.write();
            for snapshot in batch {
                writable.upsert(snapshot.name.clone(), snapshot);
            }
            mark_refreshed(&mut writable.status, now_ms);
        }
        self.bump();
    }

    // each news pull replaces the whole list
    pub fn apply_pull_news(&self, articles: Vec<NewsArticle>, now_ms: i64) {
        {
            let mut writable = self.news.write();
            writable.articles = articles;
            mark_refreshed(&mut writable.status, now_ms);
        }
        self.bump();
    }

    /// Applies a pushed price to an asset already known from a pull and
    /// returns the snapshot it replaced. Pushes for untracked ids leave the
    /// table untouched and return `None`.
    pub fn apply_push_price(&self, update: &PriceUpdate, now_ms: i64) -> Option<AssetSnapshot> {
        let previous = {
            let mut writable = self.assets.write();
            let current = writable.entries.get_mut(&update.asset_id)?;
            let previous = current.clone();
            current.apply_push(update, now_ms);
            previous
        };
        self.bump();
        Some(previous)
    }

    pub fn apply_asset_detail(&self, detail: AssetDetail) {
        self.asset_details.write().insert(detail.id.clone(), detail);
        self.bump();
    }

    pub fn apply_asset_history(&self, asset_id: &str, points: Vec<PricePoint>) {
        self.asset_history
            .write()
            .insert(asset_id.to_string(), points);
        self.bump();
    }

    pub fn apply_city_history(&self, city: &str, samples: Vec<WeatherSample>) {
        self.city_history.write().insert(city.to_string(), samples);
        self.bump();
    }

    pub fn mark_loading(&self, domain: DataDomain) {
        self.with_status(domain, |status| status.loading = true);
    }

    pub fn record_fetch_error(&self, domain: DataDomain, message: String) {
        self.with_status(domain, move |status| {
            status.loading = false;
            status.error = Some(message);
        });
    }

    fn with_status<F>(&self, domain: DataDomain, update: F)
    where
        F: FnOnce(&mut DomainStatus),
    {
        match domain {
            DataDomain::Assets => update(&mut self.assets.write().status),
            DataDomain::Cities => update(&mut self.cities.write().status),
            DataDomain::News => update(&mut self.news.write().status),
        }
        self.bump();
    }

    pub fn status(&self, domain: DataDomain) -> DomainStatus {
        match domain {
            DataDomain::Assets => self.assets.read().status.clone(),
            DataDomain::Cities => self.cities.read().status.clone(),
            DataDomain::News => self.news.read().status.clone(),
        }
    }

    pub fn asset(&self, asset_id: &str) -> Option<AssetSnapshot> {
        self.assets.read().get(asset_id)
    }

    pub fn assets(&self) -> Vec<AssetSnapshot> {
        self.assets.read().list()
    }

    pub fn city(&self, name: &str) -> Option<CitySnapshot> {
        self.cities.read().get(name)
    }

    pub fn cities(&self) -> Vec<CitySnapshot> {
        self.cities.read().list()
    }

    pub fn news(&self) -> Vec<NewsArticle> {
        self.news.read().articles.clone()
    }

    pub fn asset_detail(&self, asset_id: &str) -> Option<AssetDetail> {
        self.asset_details.read().get(asset_id).cloned()
    }

    pub fn asset_history(&self, asset_id: &str) -> Vec<PricePoint> {
        self.asset_history
            .read()
            .get(asset_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn city_history(&self, city: &str) -> Vec<WeatherSample> {
        self.city_history
            .read()
            .get(city)
            .cloned()
            .unwrap_or_default()
    }
}

fn mark_refreshed(status: &mut DomainStatus, now_ms: i64) {
    status.loading = false;
    status.error = None;
    status.last_refreshed_ms = Some(now_ms);
}

use crate::dashboard::now_unix_ms;
use crate::dashboard::types::{
    AssetDetail, AssetSnapshot, CitySnapshot, NewsArticle, PricePoint, WeatherSample, HISTORY_DAYS,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_asset_snapshots(&self) -> Result<Vec<AssetSnapshot>, AppError>;

    async fn fetch_city_snapshots(&self) -> Result<Vec<CitySnapshot>, AppError>;

    async fn fetch_news(&self) -> Result<Vec<NewsArticle>, AppError>;

    async fn fetch_asset_detail(&self, asset_id: &str) -> Result<AssetDetail, AppError>;

    // one point per day, oldest first, ending today
    async fn fetch_asset_history(&self, asset_id: &str) -> Result<Vec<PricePoint>, AppError>;

    async fn fetch_city_history(&self, city: &str) -> Result<Vec<WeatherSample>, AppError>;
}

struct MockAsset {
    id: &'static str,
    name: &'static str,
    symbol: &'static str,
    base_price: f64,
    price_spread: f64,
    pct_change_24h: f64,
    market_cap: f64,
    volume_24h: f64,
    circulating_supply: f64,
    total_supply: f64,
    max_supply: Option<f64>,
    all_time_high: f64,
    all_time_high_date: &'static str,
    // (7d, 30d, 1y)
    price_changes: (f64, f64, f64),
}

static MOCK_ASSETS: [MockAsset; 3] = [
    MockAsset {
        id: "bitcoin",
        name: "Bitcoin",
        symbol: "btc",
        base_price: 50_000.0,
        price_spread: 2_000.0,
        pct_change_24h: 2.5,
        market_cap: 950_000_000_000.0,
        volume_24h: 25_000_000_000.0,
        circulating_supply: 19_000_000.0,
        total_supply: 21_000_000.0,
        max_supply: Some(21_000_000.0),
        all_time_high: 69_000.0,
        all_time_high_date: "2021-11-10T00:00:00.000Z",
        price_changes: (5.2, 10.5, 25.8),
    },
    MockAsset {
        id: "ethereum",
        name: "Ethereum",
        symbol: "eth",
        base_price: 3_000.0,
        price_spread: 200.0,
        pct_change_24h: -1.2,
        market_cap: 350_000_000_000.0,
        volume_24h: 15_000_000_000.0,
        circulating_supply: 120_000_000.0,
        total_supply: 120_000_000.0,
        max_supply: None,
        all_time_high: 4_800.0,
        all_time_high_date: "2021-11-08T00:00:00.000Z",
        price_changes: (-2.1, 8.3, 15.2),
    },
    MockAsset {
        id: "cardano",
        name: "Cardano",
        symbol: "ada",
        base_price: 1.2,
        price_spread: 0.2,
        pct_change_24h: 5.8,
        market_cap: 40_000_000_000.0,
        volume_24h: 1_500_000_000.0,
        circulating_supply: 35_000_000_000.0,
        total_supply: 45_000_000_000.0,
        max_supply: Some(45_000_000_000.0),
        all_time_high: 3.1,
        all_time_high_date: "2021-09-02T00:00:00.000Z",
        price_changes: (8.5, -5.2, -10.5),
    },
];

const DEFAULT_HISTORY_CONDITIONS: [&str; 4] = ["sunny", "partly cloudy", "cloudy", "rainy"];
const LONDON_HISTORY_CONDITIONS: [&str; 4] = ["cloudy", "rainy", "partly cloudy", "foggy"];

struct MockCity {
    name: &'static str,
    temperature: f64,
    humidity: f64,
    condition: &'static str,
    wind_speed: f64,
    history_temperature: f64,
    history_humidity: f64,
    history_conditions: &'static [&'static str],
}

static MOCK_CITIES: [MockCity; 3] = [
    MockCity {
        name: "New York",
        temperature: 22.0,
        humidity: 65.0,
        condition: "partly cloudy",
        wind_speed: 12.0,
        history_temperature: 20.0,
        history_humidity: 65.0,
        history_conditions: &DEFAULT_HISTORY_CONDITIONS,
    },
    MockCity {
        name: "London",
        temperature: 18.0,
        humidity: 75.0,
        condition: "rainy",
        wind_speed: 15.0,
        history_temperature: 16.0,
        history_humidity: 75.0,
        history_conditions: &LONDON_HISTORY_CONDITIONS,
    },
    MockCity {
        name: "Tokyo",
        temperature: 28.0,
        humidity: 60.0,
        condition: "sunny",
        wind_speed: 8.0,
        history_temperature: 26.0,
        history_humidity: 60.0,
        history_conditions: &DEFAULT_HISTORY_CONDITIONS,
    },
];

// (title, description, source, published at)
const MOCK_NEWS: [(&str, &str, &str, &str); 5] = [
    (
        "Bitcoin Surges Past $50,000 as Institutional Adoption Grows",
        "Bitcoin has surged past $50,000 as more institutional investors add the cryptocurrency to their portfolios.",
        "Crypto News",
        "2023-06-15T10:30:00Z",
    ),
    (
        "Ethereum 2.0 Upgrade: What You Need to Know",
        "The long-awaited Ethereum 2.0 upgrade is set to launch next month, promising improved scalability and reduced energy consumption.",
        "Blockchain Insider",
        "2023-06-14T14:45:00Z",
    ),
    (
        "Regulatory Challenges Facing Cryptocurrency Markets",
        "Governments worldwide are developing new regulatory frameworks for cryptocurrencies, creating both challenges and opportunities.",
        "Financial Times",
        "2023-06-13T09:15:00Z",
    ),
    (
        "NFT Market Shows Signs of Recovery After Slump",
        "The NFT market is showing signs of recovery after a prolonged slump, with trading volumes increasing by 30% in the past month.",
        "Digital Art Daily",
        "2023-06-12T16:20:00Z",
    ),
    (
        "DeFi Protocols Reach $50 Billion in Total Value Locked",
        "Decentralized finance protocols have collectively reached $50 billion in total value locked, marking a significant milestone for the sector.",
        "DeFi Pulse",
        "2023-06-11T11:10:00Z",
    ),
];

const MOCK_NEWS_IMAGE: &str = "/placeholder.svg?height=80&width=120";

pub struct MockDataSource {
    latency: Duration,
    failing: AtomicBool,
    rng: Mutex<StdRng>,
}

impl MockDataSource {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing: AtomicBool::new(false),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    async fn simulate(&self, failure: String) -> Result<(), AppError> {
        tokio::time::sleep(self.latency).await;
        if self.failing.load(Ordering::Relaxed) {
            return Err(AppError::Fetch(failure));
        }
        Ok(())
    }
}

fn mock_asset(asset_id: &str) -> Option<&'static MockAsset> {
    MOCK_ASSETS.iter().find(|asset| asset.id == asset_id)
}

fn mock_city(city: &str) -> Option<&'static MockCity> {
    MOCK_CITIES.iter().find(|candidate| candidate.name == city)
}

fn history_dates() -> Vec<String> {
    let today = Utc::now();
    (0..HISTORY_DAYS)
        .rev()
        .map(|days_ago| {
            (today - chrono::Duration::days(days_ago)).to_rfc3339_opts(SecondsFormat::Millis, true)
        })
        .collect()
}

#[async_trait]
impl DataSource for MockDataSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_asset_snapshots(&self) -> Result<Vec<AssetSnapshot>, AppError> {
        self.simulate("failed to fetch cryptocurrency data".to_string())
            .await?;
        let now_ms = now_unix_ms();
        let jitter: Vec<f64> = {
            let mut rng = self.rng.lock();
            MOCK_ASSETS.iter().map(|_| rng.gen::<f64>()).collect()
        };

        Ok(MOCK_ASSETS
            .iter()
            .zip(jitter)
            .map(|(asset, jitter)| AssetSnapshot {
                id: asset.id.to_string(),
                name: asset.name.to_string(),
                symbol: asset.symbol.to_string(),
                price: asset.base_price + jitter * asset.price_spread,
                pct_change_24h: asset.pct_change_24h,
                market_cap: Some(asset.market_cap),
                last_updated_ms: now_ms,
            })
            .collect())
    }

    async fn fetch_city_snapshots(&self) -> Result<Vec<CitySnapshot>, AppError> {
        self.simulate("failed to fetch weather data".to_string())
            .await?;
        let now_ms = now_unix_ms();

        Ok(MOCK_CITIES
            .iter()
            .map(|city| CitySnapshot {
                name: city.name.to_string(),
                temperature: city.temperature,
                humidity: city.humidity,
                condition: city.condition.to_string(),
                wind_speed: city.wind_speed,
                last_updated_ms: now_ms,
            })
            .collect())
    }

    async fn fetch_news(&self) -> Result<Vec<NewsArticle>, AppError> {
        self.simulate("failed to fetch news data".to_string()).await?;

        Ok(MOCK_NEWS
            .iter()
            .enumerate()
            .map(|(index, (title, description, source, published_at))| {
                let id = (index + 1).to_string();
                NewsArticle {
                    url: format!("https://example.com/news/{id}"),
                    id,
                    title: title.to_string(),
                    description: description.to_string(),
                    source: source.to_string(),
                    published_at: published_at.to_string(),
                    image_url: Some(MOCK_NEWS_IMAGE.to_string()),
                }
            })
            .collect())
    }

    async fn fetch_asset_detail(&self, asset_id: &str) -> Result<AssetDetail, AppError> {
        let failure = format!("failed to fetch details for {asset_id}");
        self.simulate(failure.clone()).await?;
        let asset = mock_asset(asset_id).ok_or(AppError::Fetch(failure))?;
        let (price_change_7d, price_change_30d, price_change_1y) = asset.price_changes;

        Ok(AssetDetail {
            id: asset.id.to_string(),
            market_cap: asset.market_cap,
            volume_24h: asset.volume_24h,
            circulating_supply: asset.circulating_supply,
            total_supply: asset.total_supply,
            max_supply: asset.max_supply,
            all_time_high: asset.all_time_high,
            all_time_high_date: asset.all_time_high_date.to_string(),
            price_change_7d,
            price_change_30d,
            price_change_1y,
        })
    }

    async fn fetch_asset_history(&self, asset_id: &str) -> Result<Vec<PricePoint>, AppError> {
        let failure = format!("failed to fetch history for {asset_id}");
        self.simulate(failure.clone()).await?;
        let asset = mock_asset(asset_id).ok_or(AppError::Fetch(failure))?;
        let dates = history_dates();
        let points = {
            let mut rng = self.rng.lock();
            dates
                .into_iter()
                .map(|date| PricePoint {
                    date,
                    price: asset.base_price + (rng.gen::<f64>() - 0.5) * asset.price_spread,
                })
                .collect()
        };
        Ok(points)
    }

    async fn fetch_city_history(&self, city: &str) -> Result<Vec<WeatherSample>, AppError> {
        let failure = format!("failed to fetch weather history for {city}");
        self.simulate(failure.clone()).await?;
        let city = mock_city(city).ok_or(AppError::Fetch(failure))?;
        let dates = history_dates();
        let samples = {
            let mut rng = self.rng.lock();
            dates
                .into_iter()
                .map(|date| WeatherSample {
                    date,
                    temperature: city.history_temperature + f64::from(rng.gen_range(-2..=3_i32)),
                    humidity: city.history_humidity + f64::from(rng.gen_range(-5..=4_i32)),
                    condition: city
                        .history_conditions
                        .choose(&mut *rng)
                        .copied()
                        .unwrap_or(city.condition)
                        .to_string(),
                    wind_speed: f64::from(rng.gen_range(5..=14_i32)),
                })
                .collect()
        };
        Ok(samples)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetSnapshotWire {
    id: String,
    name: String,
    symbol: String,
    price: f64,
    #[serde(rename = "priceChange24h")]
    price_change_24h: f64,
    #[serde(default)]
    market_cap: Option<f64>,
}

impl AssetSnapshotWire {
    fn into_snapshot(self, fetched_at_ms: i64) -> Result<AssetSnapshot, AppError> {
        if self.id.trim().is_empty() {
            return Err(AppError::Fetch("asset snapshot without id".to_string()));
        }
        if !self.price.is_finite() || !self.price_change_24h.is_finite() {
            return Err(AppError::Fetch(format!(
                "asset snapshot '{}' has non-finite price fields",
                self.id
            )));
        }

        Ok(AssetSnapshot {
            id: self.id,
            name: self.name,
            symbol: self.symbol,
            price: self.price,
            pct_change_24h: self.price_change_24h,
            market_cap: self.market_cap,
            last_updated_ms: fetched_at_ms,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitySnapshotWire {
    city: String,
    temperature: f64,
    humidity: f64,
    condition: String,
    wind_speed: f64,
}

impl CitySnapshotWire {
    fn into_snapshot(self, fetched_at_ms: i64) -> Result<CitySnapshot, AppError> {
        if self.city.trim().is_empty() {
            return Err(AppError::Fetch("weather snapshot without city".to_string()));
        }

        Ok(CitySnapshot {
            name: self.city,
            temperature: self.temperature,
            humidity: self.humidity,
            condition: self.condition,
            wind_speed: self.wind_speed,
            last_updated_ms: fetched_at_ms,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsArticleWire {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    url: String,
    source: String,
    published_at: String,
    #[serde(default)]
    image_url: Option<String>,
}

impl From<NewsArticleWire> for NewsArticle {
    fn from(value: NewsArticleWire) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            url: value.url,
            source: value.source,
            published_at: value.published_at,
            image_url: value.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetDetailWire {
    id: String,
    market_cap: f64,
    volume_24h: f64,
    circulating_supply: f64,
    total_supply: f64,
    #[serde(default)]
    max_supply: Option<f64>,
    all_time_high: f64,
    #[serde(default)]
    all_time_high_date: String,
    price_change_7d: f64,
    price_change_30d: f64,
    price_change_1y: f64,
}

impl From<AssetDetailWire> for AssetDetail {
    fn from(value: AssetDetailWire) -> Self {
        Self {
            id: value.id,
            market_cap: value.market_cap,
            volume_24h: value.volume_24h,
            circulating_supply: value.circulating_supply,
            total_supply: value.total_supply,
            // feeds report an uncapped supply as 0
            max_supply: value.max_supply.filter(|supply| *supply > 0.0),
            all_time_high: value.all_time_high,
            all_time_high_date: value.all_time_high_date,
            price_change_7d: value.price_change_7d,
            price_change_30d: value.price_change_30d,
            price_change_1y: value.price_change_1y,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeatherSampleWire {
    date: String,
    #[serde(alias = "temp")]
    temperature: f64,
    humidity: f64,
    condition: String,
    wind_speed: f64,
}

impl From<WeatherSampleWire> for WeatherSample {
    fn from(value: WeatherSampleWire) -> Self {
        Self {
            date: value.date,
            temperature: value.temperature,
            humidity: value.humidity,
            condition: value.condition,
            wind_speed: value.wind_speed,
        }
    }
}

// GET {base}/assets, /assets/{id}, /assets/{id}/history, /cities,
// /cities/{name}/history and /news, all JSON.
pub struct HttpDataSource {
    client: Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| AppError::Fetch(format!("invalid data source url: {error}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Fetch("data source url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T>(&self, segments: &[&str]) -> Result<T, AppError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let resource = segments.join("/");
        let response = self
            .client
            .get(self.endpoint(segments)?)
            .send()
            .await
            .map_err(|error| AppError::Fetch(format!("{resource} request failed: {error}")))?
            .error_for_status()
            .map_err(|error| AppError::Fetch(format!("{resource} request rejected: {error}")))?;

        response
            .json::<T>()
            .await
            .map_err(|error| AppError::Fetch(format!("{resource} payload invalid: {error}")))
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_asset_snapshots(&self) -> Result<Vec<AssetSnapshot>, AppError> {
        let payload = self.get_json::<Vec<AssetSnapshotWire>>(&["assets"]).await?;
        let fetched_at_ms = now_unix_ms();
        payload
            .into_iter()
            .map(|wire| wire.into_snapshot(fetched_at_ms))
            .collect()
    }

    async fn fetch_city_snapshots(&self) -> Result<Vec<CitySnapshot>, AppError> {
        let payload = self.get_json::<Vec<CitySnapshotWire>>(&["cities"]).await?;
        let fetched_at_ms = now_unix_ms();
        payload
            .into_iter()
            .map(|wire| wire.into_snapshot(fetched_at_ms))
            .collect()
    }

    async fn fetch_news(&self) -> Result<Vec<NewsArticle>, AppError> {
        let payload = self.get_json::<Vec<NewsArticleWire>>(&["news"]).await?;
        Ok(payload.into_iter().map(NewsArticle::from).collect())
    }

    async fn fetch_asset_detail(&self, asset_id: &str) -> Result<AssetDetail, AppError> {
        let payload = self
            .get_json::<AssetDetailWire>(&["assets", asset_id])
            .await?;
        if payload.id != asset_id {
            return Err(AppError::Fetch(format!(
                "details for '{}' returned for '{asset_id}'",
                payload.id
            )));
        }
        Ok(AssetDetail::from(payload))
    }

    async fn fetch_asset_history(&self, asset_id: &str) -> Result<Vec<PricePoint>, AppError> {
        let points = self
            .get_json::<Vec<PricePoint>>(&["assets", asset_id, "history"])
            .await?;
        if points.iter().any(|point| !point.price.is_finite()) {
            return Err(AppError::Fetch(format!(
                "history for '{asset_id}' has non-finite prices"
            )));
        }
        Ok(points)
    }

    async fn fetch_city_history(&self, city: &str) -> Result<Vec<WeatherSample>, AppError> {
        let payload = self
            .get_json::<Vec<WeatherSampleWire>>(&["cities", city, "history"])
            .await?;
        Ok(payload.into_iter().map(WeatherSample::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn mock_source_serves_fixture_assets() {
        let source = MockDataSource::new(Duration::from_millis(1_000));

        let assets = source
            .fetch_asset_snapshots()
            .await
            .expect("mock assets should load");

        let ids: Vec<&str> = assets.iter().map(|asset| asset.id.as_str()).collect();
        assert_eq!(ids, vec!["bitcoin", "ethereum", "cardano"]);
        let bitcoin = &assets[0];
        assert_eq!(bitcoin.symbol, "btc");
        assert_eq!(bitcoin.pct_change_24h, 2.5);
        assert_eq!(bitcoin.market_cap, Some(950_000_000_000.0));
        assert!((50_000.0..=52_000.0).contains(&bitcoin.price));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_source_serves_cities_and_news() {
        let source = MockDataSource::new(Duration::ZERO);

        let cities = source
            .fetch_city_snapshots()
            .await
            .expect("mock cities should load");
        let news = source.fetch_news().await.expect("mock news should load");

        let london = cities
            .iter()
            .find(|city| city.name == "London")
            .expect("London should be present");
        assert_eq!(london.condition, "rainy");
        assert_eq!(london.wind_speed, 15.0);
        assert_eq!(news.len(), 5);
        assert_eq!(news[0].id, "1");
        assert_eq!(news[4].url, "https://example.com/news/5");
        assert_eq!(news[2].source, "Financial Times");
    }

    #[tokio::test(start_paused = true)]
    async fn failing_mock_source_reports_fetch_errors() {
        let source = MockDataSource::new(Duration::ZERO);
        source.set_failing(true);

        let result = source.fetch_news().await;

        match result {
            Err(AppError::Fetch(message)) => assert_eq!(message, "failed to fetch news data"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[test]
    fn http_endpoints_trim_trailing_slash() {
        let source = HttpDataSource::new(Client::new(), "https://api.example.com/v1/");

        let endpoint = |segments: &[&str]| {
            source
                .endpoint(segments)
                .expect("endpoint should build")
                .to_string()
        };
        assert_eq!(endpoint(&["assets"]), "https://api.example.com/v1/assets");
        assert_eq!(endpoint(&["news"]), "https://api.example.com/v1/news");
        assert_eq!(
            endpoint(&["cities", "New York", "history"]),
            "https://api.example.com/v1/cities/New%20York/history"
        );

        let root = HttpDataSource::new(Client::new(), "https://api.example.com");
        assert_eq!(
            root.endpoint(&["assets", "bitcoin"])
                .expect("endpoint should build")
                .as_str(),
            "https://api.example.com/assets/bitcoin"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn mock_source_serves_asset_details() {
        let source = MockDataSource::new(Duration::from_millis(1_000));

        let bitcoin = source
            .fetch_asset_detail("bitcoin")
            .await
            .expect("bitcoin details should load");
        let ethereum = source
            .fetch_asset_detail("ethereum")
            .await
            .expect("ethereum details should load");

        assert_eq!(bitcoin.volume_24h, 25_000_000_000.0);
        assert_eq!(bitcoin.max_supply, Some(21_000_000.0));
        assert_eq!(bitcoin.all_time_high, 69_000.0);
        assert_eq!(bitcoin.all_time_high_date, "2021-11-10T00:00:00.000Z");
        assert_eq!(
            (bitcoin.price_change_7d, bitcoin.price_change_30d, bitcoin.price_change_1y),
            (5.2, 10.5, 25.8)
        );
        assert_eq!(ethereum.max_supply, None);
        assert!(matches!(
            source.fetch_asset_detail("dogecoin").await,
            Err(AppError::Fetch(message)) if message == "failed to fetch details for dogecoin"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_asset_history_covers_a_week_around_the_base_price() {
        let source = MockDataSource::new(Duration::ZERO);

        let history = source
            .fetch_asset_history("ethereum")
            .await
            .expect("ethereum history should load");

        assert_eq!(history.len(), HISTORY_DAYS as usize);
        assert!(history
            .iter()
            .all(|point| (2_900.0..=3_100.0).contains(&point.price)));
        assert!(history.windows(2).all(|pair| pair[0].date < pair[1].date));
        assert!(source.fetch_asset_history("dogecoin").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn mock_city_history_follows_city_baselines() {
        let source = MockDataSource::new(Duration::ZERO);

        let london = source
            .fetch_city_history("London")
            .await
            .expect("London history should load");

        assert_eq!(london.len(), HISTORY_DAYS as usize);
        for sample in &london {
            assert!((14.0..=19.0).contains(&sample.temperature));
            assert!((70.0..=79.0).contains(&sample.humidity));
            assert!((5.0..=14.0).contains(&sample.wind_speed));
            assert!(LONDON_HISTORY_CONDITIONS.contains(&sample.condition.as_str()));
        }

        source.set_failing(true);
        assert!(matches!(
            source.fetch_city_history("Tokyo").await,
            Err(AppError::Fetch(message)) if message == "failed to fetch weather history for Tokyo"
        ));
    }

    #[test]
    fn detail_wire_treats_zero_max_supply_as_uncapped() {
        let wire = AssetDetailWire {
            id: "ethereum".to_string(),
            market_cap: 350_000_000_000.0,
            volume_24h: 15_000_000_000.0,
            circulating_supply: 120_000_000.0,
            total_supply: 120_000_000.0,
            max_supply: Some(0.0),
            all_time_high: 4_800.0,
            all_time_high_date: "2021-11-08T00:00:00.000Z".to_string(),
            price_change_7d: -2.1,
            price_change_30d: 8.3,
            price_change_1y: 15.2,
        };

        let detail = AssetDetail::from(wire);

        assert_eq!(detail.max_supply, None);
        assert_eq!(detail.volume_24h, 15_000_000_000.0);
    }

    #[test]
    fn asset_wire_rejects_blank_id() {
        let wire = AssetSnapshotWire {
            id: " ".to_string(),
            name: "Nothing".to_string(),
            symbol: "nil".to_string(),
            price: 1.0,
            price_change_24h: 0.0,
            market_cap: None,
        };

        assert!(wire.into_snapshot(0).is_err());
    }

    #[test]
    fn city_wire_maps_into_snapshot() {
        let wire = CitySnapshotWire {
            city: "Tokyo".to_string(),
            temperature: 28.0,
            humidity: 60.0,
            condition: "sunny".to_string(),
            wind_speed: 8.0,
        };

        let snapshot = wire.into_snapshot(42).expect("valid city should map");

        assert_eq!(snapshot.name, "Tokyo");
        assert_eq!(snapshot.last_updated_ms, 42);
    }
}

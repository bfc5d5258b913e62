use crate::error::AppError;
use serde::{Deserialize, Serialize};

pub const NOTIFICATION_CAPACITY: usize = 20;
pub const DEFAULT_PRICE_ALERT_THRESHOLD_PCT: f64 = 2.0;
pub const DEFAULT_CONNECT_LATENCY_MS: u64 = 1_000;
pub const DEFAULT_PRICE_TICK_MS: u64 = 10_000;
pub const DEFAULT_ADVISORY_TICK_MS: u64 = 30_000;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_MOCK_SOURCE_LATENCY_MS: u64 = 1_000;
pub const HISTORY_DAYS: i64 = 7;

pub const PRICE_UPDATE_FRAME: &str = "price_update";
pub const WEATHER_ALERT_FRAME: &str = "weather_alert";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Mock,
    WebSocket,
}

impl ChannelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::WebSocket => "websocket",
        }
    }

    pub fn parse_str(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "websocket" | "ws" => Ok(Self::WebSocket),
            other => Err(AppError::InvalidArgument(format!(
                "unsupported channel mode '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatusSnapshot {
    pub state: ConnectionState,
    pub mode: ChannelMode,
    pub url: Option<String>,
    pub frames_received: u64,
    pub frames_discarded: u64,
    pub last_frame_at_ms: Option<i64>,
}

impl ConnectionStatusSnapshot {
    pub fn disconnected(mode: ChannelMode, url: Option<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            mode,
            url,
            frames_received: 0,
            frames_discarded: 0,
            last_frame_at_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub payload: Vec<u8>,
    pub received_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceUpdate {
    pub asset_id: String,
    pub price: f64,
    pub pct_change_24h: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherAdvisory {
    pub city: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    PriceUpdate(PriceUpdate),
    WeatherAdvisory(WeatherAdvisory),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetSnapshot {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub pct_change_24h: f64,
    pub market_cap: Option<f64>,
    pub last_updated_ms: i64,
}

impl AssetSnapshot {
    pub fn apply_push(&mut self, update: &PriceUpdate, now_ms: i64) {
        self.price = update.price;
        self.pct_change_24h = update.pct_change_24h;
        self.last_updated_ms = now_ms;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CitySnapshot {
    pub name: String,
    pub temperature: f64,
    pub humidity: f64,
    pub condition: String,
    pub wind_speed: f64,
    pub last_updated_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub published_at: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetDetail {
    pub id: String,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub circulating_supply: f64,
    pub total_supply: f64,
    // None for uncapped assets such as ethereum
    pub max_supply: Option<f64>,
    pub all_time_high: f64,
    pub all_time_high_date: String,
    pub price_change_7d: f64,
    pub price_change_30d: f64,
    pub price_change_1y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSample {
    pub date: String,
    pub temperature: f64,
    pub humidity: f64,
    pub condition: String,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PriceAlert,
    WeatherAlert,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at_ms: i64,
    pub read: bool,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: String, message: String, created_at_ms: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            title,
            message,
            created_at_ms,
            read: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteKind {
    City,
    Asset,
}

impl FavoriteKind {
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::City => "favoriteCities",
            Self::Asset => "favoriteCryptos",
        }
    }

    pub fn parse_str(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "city" | "cities" => Ok(Self::City),
            "asset" | "crypto" | "cryptos" => Ok(Self::Asset),
            other => Err(AppError::InvalidArgument(format!(
                "unsupported favorite kind '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataDomain {
    Assets,
    Cities,
    News,
}

impl DataDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Cities => "cities",
            Self::News => "news",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub last_refreshed_ms: Option<i64>,
}

pub fn display_name(asset_id: &str) -> String {
    let mut chars = asset_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdateWire {
    pub id: String,
    pub price: f64,
    #[serde(rename = "priceChange24h")]
    pub price_change_24h: f64,
}

impl TryFrom<PriceUpdateWire> for PriceUpdate {
    type Error = String;

    fn try_from(value: PriceUpdateWire) -> Result<Self, Self::Error> {
        let asset_id = value.id.trim().to_string();
        if asset_id.is_empty() {
            return Err("asset id must be non-empty".to_string());
        }
        if !value.price.is_finite() || value.price < 0.0 {
            return Err("price must be finite and non-negative".to_string());
        }
        if !value.price_change_24h.is_finite() {
            return Err("priceChange24h must be finite".to_string());
        }

        Ok(Self {
            asset_id,
            price: value.price,
            pct_change_24h: value.price_change_24h,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherAlertWire {
    pub city: String,
    pub alert: String,
}

impl TryFrom<WeatherAlertWire> for WeatherAdvisory {
    type Error = String;

    fn try_from(value: WeatherAlertWire) -> Result<Self, Self::Error> {
        let city = value.city.trim();
        if city.is_empty() {
            return Err("city must be non-empty".to_string());
        }
        let message = value.alert.trim();
        if message.is_empty() {
            return Err("alert must be non-empty".to_string());
        }

        Ok(Self {
            city: city.to_string(),
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FrameEnvelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_display_name_from_asset_id() {
        assert_eq!(display_name("bitcoin"), "Bitcoin");
        assert_eq!(display_name("Cardano"), "Cardano");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn favorite_kinds_map_to_storage_keys() {
        assert_eq!(FavoriteKind::City.storage_key(), "favoriteCities");
        assert_eq!(FavoriteKind::Asset.storage_key(), "favoriteCryptos");
        assert_eq!(
            FavoriteKind::parse_str("crypto").expect("crypto should parse"),
            FavoriteKind::Asset
        );
        assert!(FavoriteKind::parse_str("planet").is_err());
    }

    #[test]
    fn rejects_price_wire_with_blank_id() {
        let result = PriceUpdate::try_from(PriceUpdateWire {
            id: "  ".to_string(),
            price: 10.0,
            price_change_24h: 1.0,
        });
        assert!(result.is_err());
    }

    #[test]
    fn push_only_touches_price_fields() {
        let mut snapshot = AssetSnapshot {
            id: "bitcoin".to_string(),
            name: "Bitcoin".to_string(),
            symbol: "btc".to_string(),
            price: 50_000.0,
            pct_change_24h: 2.5,
            market_cap: Some(950_000_000_000.0),
            last_updated_ms: 1,
        };
        let update = PriceUpdate {
            asset_id: "bitcoin".to_string(),
            price: 51_000.0,
            pct_change_24h: -1.0,
        };

        snapshot.apply_push(&update, 2);

        assert_eq!(snapshot.price, 51_000.0);
        assert_eq!(snapshot.pct_change_24h, -1.0);
        assert_eq!(snapshot.symbol, "btc");
        assert_eq!(snapshot.market_cap, Some(950_000_000_000.0));
        assert_eq!(snapshot.last_updated_ms, 2);
    }
}

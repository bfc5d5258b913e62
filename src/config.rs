use crate::dashboard::alerts::AlertPolicy;
use crate::dashboard::connection::ChannelConfig;
use crate::dashboard::types::{
    ChannelMode, DEFAULT_ADVISORY_TICK_MS, DEFAULT_CONNECT_LATENCY_MS,
    DEFAULT_MOCK_SOURCE_LATENCY_MS, DEFAULT_PRICE_ALERT_THRESHOLD_PCT, DEFAULT_PRICE_TICK_MS,
    DEFAULT_REFRESH_INTERVAL_MS,
};
use crate::error::AppError;
use serde::Deserialize;
use std::str::FromStr;

pub const MAX_CONNECT_LATENCY_MS: u64 = 30_000;
pub const MIN_TICK_MS: u64 = 100;
pub const MAX_TICK_MS: u64 = 3_600_000;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const MIN_REFRESH_INTERVAL_MS: u64 = 1_000;
pub const MAX_REFRESH_INTERVAL_MS: u64 = 3_600_000;
pub const MAX_PRICE_ALERT_THRESHOLD_PCT: f64 = 100.0;
pub const MAX_PRICE_ALERT_COOLDOWN_MS: u64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceKind {
    Mock { latency_ms: u64 },
    Http { base_url: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardArgs {
    pub channel_mode: Option<String>,
    pub channel_url: Option<String>,
    pub connect_latency_ms: Option<u64>,
    pub price_tick_ms: Option<u64>,
    pub advisory_tick_ms: Option<u64>,
    pub reconnect_attempts: Option<u32>,
    pub refresh_interval_ms: Option<u64>,
    pub price_alert_threshold_pct: Option<f64>,
    pub price_alert_cooldown_ms: Option<u64>,
    pub data_source: Option<String>,
    pub data_base_url: Option<String>,
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub channel: ChannelConfig,
    pub refresh_interval_ms: u64,
    pub alert_policy: AlertPolicy,
    pub data_source: DataSourceKind,
    pub db_path: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            alert_policy: AlertPolicy::default(),
            data_source: DataSourceKind::Mock {
                latency_ms: DEFAULT_MOCK_SOURCE_LATENCY_MS,
            },
            db_path: None,
        }
    }
}

impl DashboardArgs {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            channel_mode: text("CHANNEL_MODE"),
            channel_url: text("CHANNEL_URL"),
            connect_latency_ms: parse_var("CONNECT_LATENCY_MS", text("CONNECT_LATENCY_MS"))?,
            price_tick_ms: parse_var("PRICE_TICK_MS", text("PRICE_TICK_MS"))?,
            advisory_tick_ms: parse_var("ADVISORY_TICK_MS", text("ADVISORY_TICK_MS"))?,
            reconnect_attempts: parse_var("RECONNECT_ATTEMPTS", text("RECONNECT_ATTEMPTS"))?,
            refresh_interval_ms: parse_var("REFRESH_INTERVAL_MS", text("REFRESH_INTERVAL_MS"))?,
            price_alert_threshold_pct: parse_var(
                "PRICE_ALERT_THRESHOLD_PCT",
                text("PRICE_ALERT_THRESHOLD_PCT"),
            )?,
            price_alert_cooldown_ms: parse_var(
                "PRICE_ALERT_COOLDOWN_MS",
                text("PRICE_ALERT_COOLDOWN_MS"),
            )?,
            data_source: text("DATA_SOURCE"),
            data_base_url: text("DATA_BASE_URL"),
            db_path: text("APP_DB_PATH"),
        })
    }

    pub fn normalize(self) -> Result<DashboardConfig, AppError> {
        let mode = match self.channel_mode.as_deref() {
            Some(value) => ChannelMode::parse_str(value)?,
            None => ChannelMode::Mock,
        };

        let url = self.channel_url;
        if mode == ChannelMode::WebSocket {
            match url.as_deref() {
                Some(value) if value.starts_with("ws://") || value.starts_with("wss://") => {}
                _ => {
                    return Err(AppError::InvalidArgument(
                        "CHANNEL_URL must be a ws:// or wss:// url in websocket mode".to_string(),
                    ))
                }
            }
        }

        let connect_latency_ms = self
            .connect_latency_ms
            .unwrap_or(DEFAULT_CONNECT_LATENCY_MS);
        if connect_latency_ms > MAX_CONNECT_LATENCY_MS {
            return Err(AppError::InvalidArgument(format!(
                "CONNECT_LATENCY_MS must be at most {MAX_CONNECT_LATENCY_MS}"
            )));
        }

        let price_tick_ms = self.price_tick_ms.unwrap_or(DEFAULT_PRICE_TICK_MS);
        let advisory_tick_ms = self.advisory_tick_ms.unwrap_or(DEFAULT_ADVISORY_TICK_MS);
        for (key, value) in [
            ("PRICE_TICK_MS", price_tick_ms),
            ("ADVISORY_TICK_MS", advisory_tick_ms),
        ] {
            if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&value) {
                return Err(AppError::InvalidArgument(format!(
                    "{key} must be between {MIN_TICK_MS} and {MAX_TICK_MS}"
                )));
            }
        }

        let reconnect_attempts = self.reconnect_attempts.unwrap_or(0);
        if reconnect_attempts > MAX_RECONNECT_ATTEMPTS {
            return Err(AppError::InvalidArgument(format!(
                "RECONNECT_ATTEMPTS must be at most {MAX_RECONNECT_ATTEMPTS}"
            )));
        }

        let refresh_interval_ms = self
            .refresh_interval_ms
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS);
        if !(MIN_REFRESH_INTERVAL_MS..=MAX_REFRESH_INTERVAL_MS).contains(&refresh_interval_ms) {
            return Err(AppError::InvalidArgument(format!(
                "REFRESH_INTERVAL_MS must be between {MIN_REFRESH_INTERVAL_MS} and {MAX_REFRESH_INTERVAL_MS}"
            )));
        }

        let price_threshold_pct = self
            .price_alert_threshold_pct
            .unwrap_or(DEFAULT_PRICE_ALERT_THRESHOLD_PCT);
        if !price_threshold_pct.is_finite()
            || !(0.0..=MAX_PRICE_ALERT_THRESHOLD_PCT).contains(&price_threshold_pct)
        {
            return Err(AppError::InvalidArgument(format!(
                "PRICE_ALERT_THRESHOLD_PCT must be between 0 and {MAX_PRICE_ALERT_THRESHOLD_PCT}"
            )));
        }

        let price_cooldown_ms = self.price_alert_cooldown_ms.filter(|value| *value > 0);
        if price_cooldown_ms.is_some_and(|value| value > MAX_PRICE_ALERT_COOLDOWN_MS) {
            return Err(AppError::InvalidArgument(format!(
                "PRICE_ALERT_COOLDOWN_MS must be at most {MAX_PRICE_ALERT_COOLDOWN_MS}"
            )));
        }

        let data_source = match self
            .data_source
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            None | Some("mock") => DataSourceKind::Mock {
                latency_ms: DEFAULT_MOCK_SOURCE_LATENCY_MS,
            },
            Some("http") => {
                let base_url = self
                    .data_base_url
                    .filter(|value| value.starts_with("http://") || value.starts_with("https://"))
                    .ok_or_else(|| {
                        AppError::InvalidArgument(
                            "DATA_BASE_URL must be an http:// or https:// url when DATA_SOURCE=http"
                                .to_string(),
                        )
                    })?;
                DataSourceKind::Http { base_url }
            }
            Some(other) => {
                return Err(AppError::InvalidArgument(format!(
                    "unsupported data source '{other}'"
                )))
            }
        };

        Ok(DashboardConfig {
            channel: ChannelConfig {
                mode,
                url,
                connect_latency_ms,
                price_tick_ms,
                advisory_tick_ms,
                reconnect_attempts,
                seed: None,
            },
            refresh_interval_ms,
            alert_policy: AlertPolicy {
                price_threshold_pct,
                price_cooldown_ms,
            },
            data_source,
            db_path: self.db_path,
        })
    }
}

fn parse_var<T>(key: &str, raw: Option<String>) -> Result<Option<T>, AppError>
where
    T: FromStr,
{
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|_| AppError::InvalidArgument(format!("{key} has invalid value '{value}'")))
    })
    .transpose()
}

use crate::dashboard::notifications::NotificationLog;
use crate::dashboard::types::{
    display_name, AssetSnapshot, Notification, NotificationKind, PriceUpdate, WeatherAdvisory,
    DEFAULT_PRICE_ALERT_THRESHOLD_PCT,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    // strict: an alert needs abs(pct_change_24h) above this
    pub price_threshold_pct: f64,
    pub price_cooldown_ms: Option<u64>,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            price_threshold_pct: DEFAULT_PRICE_ALERT_THRESHOLD_PCT,
            price_cooldown_ms: None,
        }
    }
}

pub fn price_alert(
    previous: Option<&AssetSnapshot>,
    update: &PriceUpdate,
    threshold_pct: f64,
    now_ms: i64,
) -> Option<Notification> {
    let magnitude = update.pct_change_24h.abs();
    if magnitude <= threshold_pct {
        return None;
    }

    let asset_name = previous
        .map(|snapshot| snapshot.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| display_name(&update.asset_id));
    let direction = if update.pct_change_24h > 0.0 {
        "up"
    } else {
        "down"
    };

    Some(Notification::new(
        NotificationKind::PriceAlert,
        format!("{asset_name} price alert"),
        format!("{asset_name} price has gone {direction} by {magnitude:.2}%"),
        now_ms,
    ))
}

pub fn weather_alert(advisory: &WeatherAdvisory, now_ms: i64) -> Notification {
    Notification::new(
        NotificationKind::WeatherAlert,
        format!("Weather alert for {}", advisory.city),
        advisory.message.clone(),
        now_ms,
    )
}

#[derive(Debug)]
pub struct AlertEngine {
    policy: AlertPolicy,
    sink: Arc<NotificationLog>,
    last_price_alert_ms: Mutex<HashMap<String, i64>>,
}

impl AlertEngine {
    pub fn new(policy: AlertPolicy, sink: Arc<NotificationLog>) -> Self {
        Self {
            policy,
            sink,
            last_price_alert_ms: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    pub fn on_price_update(
        &self,
        previous: Option<&AssetSnapshot>,
        update: &PriceUpdate,
        now_ms: i64,
    ) -> Option<Notification> {
        let notification = price_alert(previous, update, self.policy.price_threshold_pct, now_ms)?;

        if let Some(cooldown_ms) = self.policy.price_cooldown_ms {
            let cooldown_ms = cooldown_ms.min(i64::MAX as u64) as i64;
            let mut last_alerts = self.last_price_alert_ms.lock();
            if let Some(last_ms) = last_alerts.get(&update.asset_id) {
                if now_ms.saturating_sub(*last_ms) < cooldown_ms {
                    debug!(asset = %update.asset_id, "price alert suppressed by cooldown");
                    return None;
                }
            }
            last_alerts.retain(|_, last_ms| now_ms.saturating_sub(*last_ms) < cooldown_ms);
            last_alerts.insert(update.asset_id.clone(), now_ms);
        }

        self.sink.push(notification.clone());
        Some(notification)
    }

    pub fn on_weather_advisory(&self, advisory: &WeatherAdvisory, now_ms: i64) -> Notification {
        let notification = weather_alert(advisory, now_ms);
        self.sink.push(notification.clone());
        notification
    }
}

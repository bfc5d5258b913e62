use crate::dashboard::alerts::AlertEngine;
use crate::dashboard::connection::{FrameDisposition, FrameHandler};
use crate::dashboard::decoder::decode_frame;
use crate::dashboard::now_unix_ms;
use crate::dashboard::sources::DataSource;
use crate::dashboard::store::DashboardStore;
use crate::dashboard::types::{DataDomain, DomainEvent, RawFrame};
use crate::error::{AppError, DecodeError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const DECODE_WARN_THROTTLE_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    PriceApplied { alerted: bool },
    // price for an asset no pull has reported yet; the store is left alone
    PriceUntracked { alerted: bool },
    AdvisoryRaised,
    Discarded,
}

#[derive(Debug, Default)]
struct DecodeWarnThrottle {
    last_emit: HashMap<&'static str, Instant>,
    suppressed: HashMap<&'static str, u64>,
}

impl DecodeWarnThrottle {
    // Some(suppressed repeats) when a warning for `key` may be logged now.
    fn allow(&mut self, key: &'static str, now: Instant) -> Option<u64> {
        let window = Duration::from_millis(DECODE_WARN_THROTTLE_MS);
        let throttled = self
            .last_emit
            .get(key)
            .map(|instant| now.duration_since(*instant) < window)
            .unwrap_or(false);

        if throttled {
            *self.suppressed.entry(key).or_insert(0) += 1;
            return None;
        }

        self.last_emit.insert(key, now);
        Some(self.suppressed.remove(key).unwrap_or(0))
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.last_emit.len()
    }
}

pub struct EventDispatcher {
    store: Arc<DashboardStore>,
    alerts: Arc<AlertEngine>,
    decode_warnings: Mutex<DecodeWarnThrottle>,
}

impl EventDispatcher {
    pub fn new(store: Arc<DashboardStore>, alerts: Arc<AlertEngine>) -> Self {
        Self {
            store,
            alerts,
            decode_warnings: Mutex::new(DecodeWarnThrottle::default()),
        }
    }

    pub fn dispatch(&self, frame: &RawFrame) -> DispatchOutcome {
        let event = match decode_frame(&frame.payload) {
            Ok(event) => event,
            Err(error) => {
                self.warn_decode_failure(&error);
                return DispatchOutcome::Discarded;
            }
        };

        match event {
            DomainEvent::PriceUpdate(update) => {
                let previous = self.store.apply_push_price(&update, frame.received_at_ms);
                let alerted = self
                    .alerts
                    .on_price_update(previous.as_ref(), &update, frame.received_at_ms)
                    .is_some();
                if previous.is_none() {
                    debug!(asset = %update.asset_id, alerted, "price update for untracked asset");
                    return DispatchOutcome::PriceUntracked { alerted };
                }
                debug!(
                    asset = %update.asset_id,
                    price = update.price,
                    pct_change_24h = update.pct_change_24h,
                    alerted,
                    "price update applied"
                );
                DispatchOutcome::PriceApplied { alerted }
            }
            DomainEvent::WeatherAdvisory(advisory) => {
                self.alerts
                    .on_weather_advisory(&advisory, frame.received_at_ms);
                debug!(city = %advisory.city, "weather advisory raised");
                DispatchOutcome::AdvisoryRaised
            }
        }
    }

    fn warn_decode_failure(&self, error: &DecodeError) {
        let key = error.reason_key();
        let allowed = self.decode_warnings.lock().allow(key, Instant::now());
        if let Some(suppressed) = allowed {
            warn!(reason = key, suppressed, %error, "discarding undecodable frame");
        }
    }
}

impl FrameHandler for EventDispatcher {
    fn handle_frame(&self, frame: RawFrame) -> FrameDisposition {
        match self.dispatch(&frame) {
            DispatchOutcome::Discarded => FrameDisposition::Discarded,
            _ => FrameDisposition::Accepted,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub refreshed: Vec<DataDomain>,
    pub failed: Vec<DataDomain>,
}

/// Pulls every domain concurrently. A failed domain keeps its previous
/// snapshots and records the error on its status.
pub async fn refresh_all(source: &dyn DataSource, store: &DashboardStore) -> RefreshSummary {
    for domain in [DataDomain::Assets, DataDomain::Cities, DataDomain::News] {
        store.mark_loading(domain);
    }

    let (assets, cities, news) = tokio::join!(
        source.fetch_asset_snapshots(),
        source.fetch_city_snapshots(),
        source.fetch_news()
    );

    let now_ms = now_unix_ms();
    let mut summary = RefreshSummary::default();
    record(
        &mut summary,
        store,
        DataDomain::Assets,
        assets.map(|batch| store.apply_pull_assets(batch, now_ms)),
    );
    record(
        &mut summary,
        store,
        DataDomain::Cities,
        cities.map(|batch| store.apply_pull_cities(batch, now_ms)),
    );
    record(
        &mut summary,
        store,
        DataDomain::News,
        news.map(|articles| store.apply_pull_news(articles, now_ms)),
    );

    info!(
        source = source.name(),
        refreshed = summary.refreshed.len(),
        failed = summary.failed.len(),
        "dashboard refresh finished"
    );
    summary
}

// Details and history are fetched on demand. A failed half keeps whatever the
// store already holds for that key and is reported to the caller.
pub async fn load_asset_details(
    source: &dyn DataSource,
    store: &DashboardStore,
    asset_id: &str,
) -> Result<(), AppError> {
    let (detail, history) = tokio::join!(
        source.fetch_asset_detail(asset_id),
        source.fetch_asset_history(asset_id)
    );

    let detail = detail.map(|detail| store.apply_asset_detail(detail));
    let history = history.map(|points| store.apply_asset_history(asset_id, points));
    if let Err(error) = detail.as_ref().and(history.as_ref()) {
        warn!(asset = asset_id, %error, "asset details unavailable");
    }
    detail.and(history)
}

pub async fn load_city_history(
    source: &dyn DataSource,
    store: &DashboardStore,
    city: &str,
) -> Result<(), AppError> {
    match source.fetch_city_history(city).await {
        Ok(samples) => {
            store.apply_city_history(city, samples);
            Ok(())
        }
        Err(error) => {
            warn!(city, %error, "city weather history unavailable");
            Err(error)
        }
    }
}

fn record(
    summary: &mut RefreshSummary,
    store: &DashboardStore,
    domain: DataDomain,
    outcome: Result<(), AppError>,
) {
    match outcome {
        Ok(()) => summary.refreshed.push(domain),
        Err(error) => {
            warn!(domain = domain.as_str(), %error, "refresh failed; keeping previous snapshot");
            store.record_fetch_error(domain, error.to_string());
            summary.failed.push(domain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::alerts::AlertPolicy;
    use crate::dashboard::notifications::NotificationLog;
    use crate::dashboard::sources::MockDataSource;
    use crate::dashboard::types::{AssetSnapshot, CitySnapshot, NotificationKind};

    struct Harness {
        store: Arc<DashboardStore>,
        log: Arc<NotificationLog>,
        dispatcher: EventDispatcher,
    }

    fn harness() -> Harness {
        let store = Arc::new(DashboardStore::new());
        let log = Arc::new(NotificationLog::new());
        let alerts = Arc::new(AlertEngine::new(AlertPolicy::default(), Arc::clone(&log)));
        Harness {
            dispatcher: EventDispatcher::new(Arc::clone(&store), alerts),
            store,
            log,
        }
    }

    fn frame(json: &str) -> RawFrame {
        RawFrame {
            payload: json.as_bytes().to_vec(),
            received_at_ms: 1_000,
        }
    }

    fn tracked(harness: &Harness, id: &str, price: f64) {
        harness.store.apply_pull_assets(
            vec![AssetSnapshot {
                id: id.to_string(),
                name: crate::dashboard::types::display_name(id),
                symbol: id[..3].to_string(),
                price,
                pct_change_24h: 0.0,
                market_cap: None,
                last_updated_ms: 1,
            }],
            1,
        );
    }

    fn london() -> CitySnapshot {
        CitySnapshot {
            name: "London".to_string(),
            temperature: 18.0,
            humidity: 75.0,
            condition: "rainy".to_string(),
            wind_speed: 15.0,
            last_updated_ms: 1,
        }
    }

    #[test]
    fn price_push_updates_store_and_raises_alert() {
        let harness = harness();
        tracked(&harness, "bitcoin", 50_000.0);

        let outcome = harness.dispatcher.dispatch(&frame(
            r#"{"type":"price_update","data":{"id":"bitcoin","price":51000,"priceChange24h":3.2}}"#,
        ));

        assert_eq!(outcome, DispatchOutcome::PriceApplied { alerted: true });
        let bitcoin = harness
            .store
            .asset("bitcoin")
            .expect("bitcoin should be tracked");
        assert_eq!(bitcoin.price, 51_000.0);
        assert_eq!(bitcoin.pct_change_24h, 3.2);

        let notifications = harness.log.list();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::PriceAlert);
        assert!(notifications[0].message.contains("up"));
        assert!(notifications[0].message.contains("3.20%"));
    }

    #[test]
    fn small_price_move_updates_store_without_alert() {
        let harness = harness();
        tracked(&harness, "ethereum", 3_000.0);

        let outcome = harness.dispatcher.dispatch(&frame(
            r#"{"type":"price_update","data":{"id":"ethereum","price":3010.5,"priceChange24h":-1.2}}"#,
        ));

        assert_eq!(outcome, DispatchOutcome::PriceApplied { alerted: false });
        assert_eq!(
            harness.store.asset("ethereum").map(|asset| asset.price),
            Some(3010.5)
        );
        assert!(harness.log.is_empty());
    }

    #[test]
    fn weather_advisory_alerts_without_touching_city_snapshot() {
        let harness = harness();
        harness.store.apply_pull_cities(vec![london()], 1);
        let revision_before = harness.store.revision();

        let outcome = harness.dispatcher.dispatch(&frame(
            r#"{"type":"weather_alert","data":{"city":"London","alert":"Heavy rain expected"}}"#,
        ));

        assert_eq!(outcome, DispatchOutcome::AdvisoryRaised);
        let notifications = harness.log.list();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::WeatherAlert);
        assert_eq!(notifications[0].title, "Weather alert for London");
        assert_eq!(notifications[0].message, "Heavy rain expected");
        assert_eq!(harness.store.city("London"), Some(london()));
        assert_eq!(harness.store.revision(), revision_before);
    }

    #[test]
    fn undecodable_frames_never_reach_state() {
        let harness = harness();
        let revision_before = harness.store.revision();

        for payload in [
            "not json",
            r#"{"type":"market_depth","data":{}}"#,
            r#"{"type":"price_update","data":{"id":"bitcoin"}}"#,
            r#"{"type":"weather_alert","data":{"city":"","alert":"Heavy rain expected"}}"#,
        ] {
            assert_eq!(
                harness.dispatcher.handle_frame(frame(payload)),
                FrameDisposition::Discarded
            );
        }

        assert_eq!(harness.store.revision(), revision_before);
        assert!(harness.store.assets().is_empty());
        assert!(harness.log.is_empty());
    }

    #[test]
    fn decode_warnings_are_throttled_per_reason() {
        let mut throttle = DecodeWarnThrottle::default();
        let start = Instant::now();

        assert_eq!(throttle.allow("malformed", start), Some(0));
        assert_eq!(throttle.allow("malformed", start), None);
        assert_eq!(throttle.allow("malformed", start), None);
        assert_eq!(throttle.allow("unknown_type", start), Some(0));

        let later = start + Duration::from_millis(DECODE_WARN_THROTTLE_MS);
        assert_eq!(throttle.allow("malformed", later), Some(2));
    }

    #[test]
    fn distinct_unknown_types_share_one_throttle_entry() {
        let harness = harness();

        for index in 0..2_000 {
            let payload = format!(r#"{{"type":"kind-{index}-{}","data":{{}}}}"#, "x".repeat(512));
            harness.dispatcher.dispatch(&frame(&payload));
        }

        assert_eq!(harness.dispatcher.decode_warnings.lock().tracked_keys(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_merges_every_domain() {
        let store = DashboardStore::new();
        let source = MockDataSource::new(Duration::from_millis(1_000));

        let summary = refresh_all(&source, &store).await;

        assert_eq!(
            summary.refreshed,
            vec![DataDomain::Assets, DataDomain::Cities, DataDomain::News]
        );
        assert!(summary.failed.is_empty());
        assert_eq!(store.assets().len(), 3);
        assert_eq!(store.cities().len(), 3);
        assert_eq!(store.news().len(), 5);
        let status = store.status(DataDomain::Cities);
        assert!(!status.loading);
        assert!(status.last_refreshed_ms.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_snapshots() {
        let store = DashboardStore::new();
        let source = MockDataSource::new(Duration::ZERO);
        refresh_all(&source, &store).await;

        source.set_failing(true);
        let summary = refresh_all(&source, &store).await;

        assert_eq!(summary.failed.len(), 3);
        assert_eq!(store.assets().len(), 3);
        assert_eq!(store.news().len(), 5);
        let status = store.status(DataDomain::Assets);
        assert!(!status.loading);
        assert_eq!(
            status.error.as_deref(),
            Some("fetch error: failed to fetch cryptocurrency data")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn asset_details_land_in_the_store() {
        let store = DashboardStore::new();
        let source = MockDataSource::new(Duration::from_millis(1_000));

        load_asset_details(&source, &store, "cardano")
            .await
            .expect("cardano details should load");

        let detail = store.asset_detail("cardano").expect("detail should be stored");
        assert_eq!(detail.all_time_high, 3.1);
        assert_eq!(store.asset_history("cardano").len(), 7);
        assert!(store.asset_detail("bitcoin").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_detail_load_keeps_previous_data() {
        let store = DashboardStore::new();
        let source = MockDataSource::new(Duration::ZERO);
        load_asset_details(&source, &store, "bitcoin")
            .await
            .expect("bitcoin details should load");
        load_city_history(&source, &store, "Tokyo")
            .await
            .expect("Tokyo history should load");
        let history_before = store.asset_history("bitcoin");

        source.set_failing(true);
        let asset_result = load_asset_details(&source, &store, "bitcoin").await;
        let city_result = load_city_history(&source, &store, "Tokyo").await;

        assert!(matches!(
            asset_result,
            Err(AppError::Fetch(message)) if message == "failed to fetch details for bitcoin"
        ));
        assert!(city_result.is_err());
        assert_eq!(store.asset_history("bitcoin"), history_before);
        assert!(store.asset_detail("bitcoin").is_some());
        assert_eq!(store.city_history("Tokyo").len(), 7);
    }

    #[test]
    fn pushed_price_survives_until_next_pull() {
        let harness = harness();
        tracked(&harness, "cardano", 1.2);
        harness.dispatcher.dispatch(&frame(
            r#"{"type":"price_update","data":{"id":"cardano","price":1.31,"priceChange24h":0.4}}"#,
        ));

        assert_eq!(
            harness.store.asset("cardano").map(|asset| asset.price),
            Some(1.31)
        );
    }

    #[test]
    fn untracked_asset_push_alerts_without_growing_the_store() {
        let harness = harness();

        for index in 0..1_000 {
            let payload = format!(
                r#"{{"type":"price_update","data":{{"id":"junk{index}","price":10,"priceChange24h":0.5}}}}"#
            );
            assert_eq!(
                harness.dispatcher.dispatch(&frame(&payload)),
                DispatchOutcome::PriceUntracked { alerted: false }
            );
        }
        let outcome = harness.dispatcher.dispatch(&frame(
            r#"{"type":"price_update","data":{"id":"solana","price":150,"priceChange24h":4.5}}"#,
        ));

        assert_eq!(outcome, DispatchOutcome::PriceUntracked { alerted: true });
        assert!(harness.store.assets().is_empty());
        let notifications = harness.log.list();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Solana price alert");
    }
}

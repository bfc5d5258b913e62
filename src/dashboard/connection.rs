use crate::dashboard::now_unix_ms;
use crate::dashboard::types::{
    ChannelMode, ConnectionState, ConnectionStatusSnapshot, FrameEnvelope, PriceUpdateWire,
    RawFrame, WeatherAlertWire, DEFAULT_ADVISORY_TICK_MS, DEFAULT_CONNECT_LATENCY_MS,
    DEFAULT_PRICE_TICK_MS, PRICE_UPDATE_FRAME, WEATHER_ALERT_FRAME,
};
use crate::error::AppError;
use futures_util::StreamExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const TRANSITION_CHANNEL_CAPACITY: usize = 64;

const MOCK_ASSETS: [(&str, f64); 3] = [
    ("bitcoin", 50_000.0),
    ("ethereum", 3_000.0),
    ("cardano", 1.2),
];
const MOCK_CITIES: [&str; 3] = ["New York", "London", "Tokyo"];
const MOCK_ADVISORIES: [&str; 5] = [
    "Heavy rain expected",
    "High winds warning",
    "Extreme heat alert",
    "Thunderstorm warning",
    "Flash flood warning",
];

type ChannelWsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    Accepted,
    Discarded,
}

// Called on the session task, one frame at a time in arrival order.
pub trait FrameHandler: Send + Sync {
    fn handle_frame(&self, frame: RawFrame) -> FrameDisposition;
}

impl FrameHandler for mpsc::Sender<RawFrame> {
    fn handle_frame(&self, frame: RawFrame) -> FrameDisposition {
        match self.try_send(frame) {
            Ok(()) => FrameDisposition::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("frame sink full; dropping frame");
                FrameDisposition::Discarded
            }
            Err(mpsc::error::TrySendError::Closed(_)) => FrameDisposition::Discarded,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub mode: ChannelMode,
    pub url: Option<String>,
    pub connect_latency_ms: u64,
    pub price_tick_ms: u64,
    pub advisory_tick_ms: u64,
    // extra connect attempts after the first failure
    pub reconnect_attempts: u32,
    pub seed: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            mode: ChannelMode::Mock,
            url: None,
            connect_latency_ms: DEFAULT_CONNECT_LATENCY_MS,
            price_tick_ms: DEFAULT_PRICE_TICK_MS,
            advisory_tick_ms: DEFAULT_ADVISORY_TICK_MS,
            reconnect_attempts: 0,
            seed: None,
        }
    }
}

#[derive(Debug, Default)]
struct ChannelTelemetry {
    frames_received: AtomicU64,
    frames_discarded: AtomicU64,
    has_last_frame_at_ms: AtomicBool,
    last_frame_at_ms: AtomicI64,
}

impl ChannelTelemetry {
    fn reset(&self) {
        self.frames_received.store(0, Ordering::Relaxed);
        self.frames_discarded.store(0, Ordering::Relaxed);
        self.has_last_frame_at_ms.store(false, Ordering::Relaxed);
    }

    fn record_received(&self, received_at_ms: i64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.last_frame_at_ms
            .store(received_at_ms, Ordering::Relaxed);
        self.has_last_frame_at_ms.store(true, Ordering::Relaxed);
    }

    fn record_discarded(&self) {
        self.frames_discarded.fetch_add(1, Ordering::Relaxed);
    }

    fn fill(&self, snapshot: &mut ConnectionStatusSnapshot) {
        snapshot.frames_received = self.frames_received.load(Ordering::Relaxed);
        snapshot.frames_discarded = self.frames_discarded.load(Ordering::Relaxed);
        snapshot.last_frame_at_ms = if self.has_last_frame_at_ms.load(Ordering::Relaxed) {
            Some(self.last_frame_at_ms.load(Ordering::Relaxed))
        } else {
            None
        };
    }
}

#[derive(Debug, Clone)]
struct StatusPublisher {
    store: Arc<RwLock<ConnectionStatusSnapshot>>,
    telemetry: Arc<ChannelTelemetry>,
    transitions: broadcast::Sender<ConnectionStatusSnapshot>,
}

impl StatusPublisher {
    async fn publish(&self, state: ConnectionState) {
        let snapshot = {
            let mut writable = self.store.write().await;
            writable.state = state;
            self.telemetry.fill(&mut writable);
            writable.clone()
        };

        match &snapshot.state {
            ConnectionState::Failed(reason) => {
                warn!(mode = snapshot.mode.as_str(), %reason, "channel failed")
            }
            state => info!(mode = snapshot.mode.as_str(), state = state.label(), "channel state"),
        }

        // No subscribers is fine; the latest snapshot stays queryable.
        let _ = self.transitions.send(snapshot);
    }
}

pub struct ConnectionHandle {
    pub cancellation_token: CancellationToken,
    pub join_handle: JoinHandle<()>,
}

pub struct ConnectionManager {
    config: ChannelConfig,
    publisher: StatusPublisher,
}

impl ConnectionManager {
    pub fn new(config: ChannelConfig) -> Self {
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        let initial = ConnectionStatusSnapshot::disconnected(config.mode, config.url.clone());
        Self {
            config,
            publisher: StatusPublisher {
                store: Arc::new(RwLock::new(initial)),
                telemetry: Arc::new(ChannelTelemetry::default()),
                transitions,
            },
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionStatusSnapshot> {
        self.publisher.transitions.subscribe()
    }

    pub async fn status(&self) -> ConnectionStatusSnapshot {
        let mut snapshot = self.publisher.store.read().await.clone();
        self.publisher.telemetry.fill(&mut snapshot);
        snapshot
    }

    pub async fn open(&self, handler: Arc<dyn FrameHandler>) -> ConnectionHandle {
        self.publisher.telemetry.reset();
        self.publisher.publish(ConnectionState::Connecting).await;

        let cancellation_token = CancellationToken::new();
        let task_token = cancellation_token.clone();
        let config = self.config.clone();
        let publisher = self.publisher.clone();

        let join_handle = tokio::spawn(async move {
            run_session(config, handler, publisher, task_token).await;
        });

        ConnectionHandle {
            cancellation_token,
            join_handle,
        }
    }

    /// Cancels and joins the session task. No frame reaches the handler once
    /// this returns, including a tick that was already due.
    pub async fn close(&self, handle: ConnectionHandle) {
        handle.cancellation_token.cancel();
        if let Err(error) = handle.join_handle.await {
            warn!(%error, "channel session task ended abnormally");
        }
        self.publisher.publish(ConnectionState::Disconnected).await;
    }
}

async fn run_session(
    config: ChannelConfig,
    handler: Arc<dyn FrameHandler>,
    publisher: StatusPublisher,
    cancel_token: CancellationToken,
) {
    let mut attempt = 0_u32;
    let mut source = loop {
        let connected = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return,
            result = FrameSource::connect(&config) => result,
        };

        match connected {
            Ok(source) => break source,
            Err(error) if attempt >= config.reconnect_attempts => {
                publisher
                    .publish(ConnectionState::Failed(error.to_string()))
                    .await;
                return;
            }
            Err(error) => {
                attempt = attempt.saturating_add(1);
                warn!(attempt, %error, "channel connect failed; retrying");
                let delay = reconnect_delay(attempt);
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    };

    publisher.publish(ConnectionState::Connected).await;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            next = source.next_frame() => next,
        };

        match next {
            Ok(Some(payload)) => {
                let received_at_ms = now_unix_ms();
                publisher.telemetry.record_received(received_at_ms);
                let frame = RawFrame {
                    payload,
                    received_at_ms,
                };
                if handler.handle_frame(frame) == FrameDisposition::Discarded {
                    publisher.telemetry.record_discarded();
                }
            }
            Ok(None) => {
                publisher
                    .publish(ConnectionState::Failed("channel closed by peer".to_string()))
                    .await;
                break;
            }
            Err(error) => {
                publisher
                    .publish(ConnectionState::Failed(error.to_string()))
                    .await;
                break;
            }
        }
    }
}

enum FrameSource {
    Mock(MockChannel),
    WebSocket(Box<ChannelWsStream>),
}

impl FrameSource {
    async fn connect(config: &ChannelConfig) -> Result<Self, AppError> {
        match config.mode {
            ChannelMode::Mock => MockChannel::connect(config).await.map(Self::Mock),
            ChannelMode::WebSocket => {
                let url = config.url.as_deref().ok_or_else(|| {
                    AppError::Connection("websocket channel requires a url".to_string())
                })?;
                connect_websocket(url)
                    .await
                    .map(|stream| Self::WebSocket(Box::new(stream)))
            }
        }
    }

    // Ok(None) once the peer has closed the channel
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, AppError> {
        match self {
            Self::Mock(channel) => channel.next_frame().await.map(Some),
            Self::WebSocket(stream) => next_websocket_payload(stream).await,
        }
    }
}

async fn connect_websocket(url: &str) -> Result<ChannelWsStream, AppError> {
    let ws_config = WebSocketConfig {
        max_message_size: Some(1 << 20),
        max_frame_size: Some(1 << 20),
        ..Default::default()
    };

    let (stream, _) = connect_async_with_config(url, Some(ws_config), true).await?;
    Ok(stream)
}

async fn next_websocket_payload(
    stream: &mut ChannelWsStream,
) -> Result<Option<Vec<u8>>, AppError> {
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text_payload) => return Ok(Some(text_payload.into_bytes())),
            Message::Binary(binary_payload) => return Ok(Some(binary_payload)),
            Message::Close(frame) => {
                debug!(?frame, "websocket close frame received");
                return Ok(None);
            }
            _ => continue,
        }
    }
    Ok(None)
}

struct MockChannel {
    rng: StdRng,
    price_ticker: Interval,
    advisory_ticker: Interval,
}

impl MockChannel {
    async fn connect(config: &ChannelConfig) -> Result<Self, AppError> {
        tokio::time::sleep(Duration::from_millis(config.connect_latency_ms)).await;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            rng,
            price_ticker: delayed_interval(config.price_tick_ms),
            advisory_ticker: delayed_interval(config.advisory_tick_ms),
        })
    }

    async fn next_frame(&mut self) -> Result<Vec<u8>, AppError> {
        tokio::select! {
            biased;
            _ = self.price_ticker.tick() => self.price_frame(),
            _ = self.advisory_ticker.tick() => self.advisory_frame(),
        }
    }

    fn price_frame(&mut self) -> Result<Vec<u8>, AppError> {
        let (asset_id, base_price) = MOCK_ASSETS[self.rng.gen_range(0..MOCK_ASSETS.len())];
        let price_change_24h = (self.rng.gen::<f64>() - 0.5) * 5.0;
        let envelope = FrameEnvelope {
            kind: PRICE_UPDATE_FRAME,
            data: PriceUpdateWire {
                id: asset_id.to_string(),
                price: base_price * (1.0 + price_change_24h / 100.0),
                price_change_24h,
            },
        };
        Ok(simd_json::serde::to_vec(&envelope)?)
    }

    fn advisory_frame(&mut self) -> Result<Vec<u8>, AppError> {
        let city = MOCK_CITIES.choose(&mut self.rng).copied().unwrap_or("London");
        let alert = MOCK_ADVISORIES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("Heavy rain expected");
        let envelope = FrameEnvelope {
            kind: WEATHER_ALERT_FRAME,
            data: WeatherAlertWire {
                city: city.to_string(),
                alert: alert.to_string(),
            },
        };
        Ok(simd_json::serde::to_vec(&envelope)?)
    }
}

fn delayed_interval(period_ms: u64) -> Interval {
    let period = Duration::from_millis(period_ms.max(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn reconnect_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(6);
    let base_ms = 200_u64.saturating_mul(1_u64 << exponent);
    let jitter_ms = rand::thread_rng().gen_range(0..250_u64);
    Duration::from_millis((base_ms + jitter_ms).min(5_000))
}

pub mod alerts;
pub mod connection;
pub mod decoder;
pub mod favorites;
pub mod notifications;
pub mod persistence;
pub mod pipeline;
pub mod scheduler;
pub mod sources;
pub mod store;
pub mod types;

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_unix_ms() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis().min(i64::MAX as u128) as i64,
        Err(_) => 0,
    }
}

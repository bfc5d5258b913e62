use crate::dashboard::types::ConnectionStatusSnapshot;
use crate::error::AppError;
use crate::state::AppState;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamStopResult {
    pub stopped: bool,
    pub status: ConnectionStatusSnapshot,
}

pub async fn start_live_stream(state: &AppState) -> Result<ConnectionStatusSnapshot, AppError> {
    let mut stream_slot = state.live_stream.lock().await;
    if let Some(handle) = stream_slot.take() {
        state.connection.close(handle).await;
    }

    let handle = state.connection.open(state.dispatcher()).await;
    *stream_slot = Some(handle);
    drop(stream_slot);

    Ok(state.connection.status().await)
}

pub async fn stop_live_stream(state: &AppState) -> Result<LiveStreamStopResult, AppError> {
    let existing_handle = {
        let mut stream_slot = state.live_stream.lock().await;
        stream_slot.take()
    };

    let stopped = match existing_handle {
        Some(handle) => {
            state.connection.close(handle).await;
            true
        }
        None => false,
    };

    Ok(LiveStreamStopResult {
        stopped,
        status: state.connection.status().await,
    })
}

pub async fn live_stream_status(state: &AppState) -> Result<ConnectionStatusSnapshot, AppError> {
    Ok(state.connection.status().await)
}

use crate::dashboard::types::{
    DomainEvent, PriceUpdate, PriceUpdateWire, WeatherAdvisory, WeatherAlertWire,
    PRICE_UPDATE_FRAME, WEATHER_ALERT_FRAME,
};
use crate::error::DecodeError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FrameHeaderWire {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct FrameBodyWire<T> {
    data: T,
}

const MAX_REPORTED_TYPE_CHARS: usize = 64;

// Reads `type` first so unknown frames are reported as such. simd-json parses
// in place, so each pass works on its own copy of the payload.
pub fn decode_frame(payload: &[u8]) -> Result<DomainEvent, DecodeError> {
    let mut header_bytes = payload.to_vec();
    let header: FrameHeaderWire = simd_json::serde::from_slice(header_bytes.as_mut_slice())?;

    match header.kind.as_str() {
        PRICE_UPDATE_FRAME => {
            let wire: PriceUpdateWire = decode_body(payload, PRICE_UPDATE_FRAME)?;
            let update =
                PriceUpdate::try_from(wire).map_err(|reason| invalid(PRICE_UPDATE_FRAME, reason))?;
            Ok(DomainEvent::PriceUpdate(update))
        }
        WEATHER_ALERT_FRAME => {
            let wire: WeatherAlertWire = decode_body(payload, WEATHER_ALERT_FRAME)?;
            let advisory =
                WeatherAdvisory::try_from(wire).map_err(|reason| invalid(WEATHER_ALERT_FRAME, reason))?;
            Ok(DomainEvent::WeatherAdvisory(advisory))
        }
        _ => Err(DecodeError::UnknownType(
            header.kind.chars().take(MAX_REPORTED_TYPE_CHARS).collect(),
        )),
    }
}

fn decode_body<T>(payload: &[u8], kind: &str) -> Result<T, DecodeError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut body_bytes = payload.to_vec();
    let body: FrameBodyWire<T> = simd_json::serde::from_slice(body_bytes.as_mut_slice())
        .map_err(|error| invalid(kind, error.to_string()))?;
    Ok(body.data)
}

fn invalid(kind: &str, reason: String) -> DecodeError {
    DecodeError::InvalidData {
        kind: kind.to_string(),
        reason,
    }
}

use crate::dashboard::pipeline::{load_asset_details, load_city_history};
use crate::dashboard::types::{AssetDetail, AssetSnapshot, CitySnapshot, PricePoint, WeatherSample};
use crate::error::AppError;
use crate::state::AppState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailArgs {
    pub id: String,
}

impl DetailArgs {
    fn normalize(self) -> Result<String, AppError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(AppError::InvalidArgument(
                "detail id must be non-empty".to_string(),
            ));
        }
        Ok(id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDetailsView {
    pub asset: Option<AssetSnapshot>,
    pub detail: Option<AssetDetail>,
    pub history: Vec<PricePoint>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityDetailsView {
    pub city: Option<CitySnapshot>,
    pub history: Vec<WeatherSample>,
    pub error: Option<String>,
}

pub async fn asset_details(state: &AppState, args: DetailArgs) -> Result<AssetDetailsView, AppError> {
    let asset_id = args.normalize()?;
    let loaded = load_asset_details(state.sources.as_ref(), &state.store, &asset_id).await;

    Ok(AssetDetailsView {
        asset: state.store.asset(&asset_id),
        detail: state.store.asset_detail(&asset_id),
        history: state.store.asset_history(&asset_id),
        error: loaded.err().map(|error| error.to_string()),
    })
}

pub async fn city_details(state: &AppState, args: DetailArgs) -> Result<CityDetailsView, AppError> {
    let city = args.normalize()?;
    let loaded = load_city_history(state.sources.as_ref(), &state.store, &city).await;

    Ok(CityDetailsView {
        city: state.store.city(&city),
        history: state.store.city_history(&city),
        error: loaded.err().map(|error| error.to_string()),
    })
}

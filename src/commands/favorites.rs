use crate::dashboard::types::FavoriteKind;
use crate::error::AppError;
use crate::state::AppState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteArgs {
    pub kind: String,
    pub id: String,
}

impl ToggleFavoriteArgs {
    fn normalize(self) -> Result<(FavoriteKind, String), AppError> {
        let kind = FavoriteKind::parse_str(&self.kind)?;
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(AppError::InvalidArgument(
                "favorite id must be non-empty".to_string(),
            ));
        }
        Ok((kind, id))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggleResult {
    pub kind: FavoriteKind,
    pub id: String,
    pub favorited: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesSnapshot {
    pub cities: Vec<String>,
    pub assets: Vec<String>,
}

pub async fn favorites_get(state: &AppState) -> Result<FavoritesSnapshot, AppError> {
    Ok(FavoritesSnapshot {
        cities: state.favorites.list(FavoriteKind::City).await,
        assets: state.favorites.list(FavoriteKind::Asset).await,
    })
}

pub async fn favorite_toggle(
    state: &AppState,
    args: ToggleFavoriteArgs,
) -> Result<FavoriteToggleResult, AppError> {
    let (kind, id) = args.normalize()?;
    let favorited = state.favorites.toggle(kind, &id).await;
    Ok(FavoriteToggleResult {
        kind,
        id,
        favorited,
    })
}

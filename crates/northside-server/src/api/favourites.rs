use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::favourites::{self, FavouriteToggle};
use crate::state::AppState;
use crate::voting::TrackRef;
use northside_db::entities::favourite_song;

#[derive(Debug, Serialize)]
pub struct FavouriteResponse {
    pub track_id: String,
    pub song_name: String,
    pub artist_name: String,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<favourite_song::Model> for FavouriteResponse {
    fn from(f: favourite_song::Model) -> Self {
        Self {
            track_id: f.track_id,
            song_name: f.song_name,
            artist_name: f.artist_name,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub track_id: String,
    pub status: FavouriteToggle,
}

/// POST /api/favourites: add or remove depending on current state
pub async fn toggle_favourite(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<TrackRef>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let status = favourites::toggle_favourite(&state.db, auth_user.0.sub, &body).await?;
    Ok(Json(ToggleResponse {
        track_id: body.track_id.trim().to_string(),
        status,
    }))
}

/// GET /api/favourites
pub async fn list_favourites(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<FavouriteResponse>>, ApiError> {
    let favs = favourites::list_favourites(&state.db, auth_user.0.sub).await?;
    Ok(Json(favs.into_iter().map(FavouriteResponse::from).collect()))
}

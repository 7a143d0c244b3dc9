use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::middleware::AuthUser;
use crate::error::{api_error, ApiError, AppError};
use crate::favourites;
use crate::lifecycle;
use crate::reviews::{self, ReviewView};
use crate::song_lookup::TrackInfo;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SongSearchParams {
    pub song: String,
    pub artist: String,
}

#[derive(Debug, Serialize)]
pub struct SongSearchResponse {
    pub track: TrackInfo,
    pub in_favourites: bool,
    pub reviews: Vec<ReviewView>,
    /// Whether the searcher is the DJ of the event they are in.
    pub is_dj: bool,
}

/// GET /api/search?song=...&artist=...
pub async fn search_song(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<SongSearchParams>,
) -> Result<Json<SongSearchResponse>, ApiError> {
    if params.song.trim().is_empty() {
        return Err(AppError::EmptyInput("song").into());
    }
    if params.artist.trim().is_empty() {
        return Err(AppError::EmptyInput("artist").into());
    }

    let track = state
        .songs
        .search_track(&params.song, &params.artist)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Song not found"))?;

    let user_id = auth_user.0.sub;
    let in_favourites = favourites::is_favourite(&state.db, user_id, &track.track_id).await?;
    let reviews = reviews::reviews_for_track(&state.db, &track.track_id).await?;
    let is_dj = lifecycle::current_membership(&state.db, user_id)
        .await?
        .is_some_and(|m| m.is_dj);

    Ok(Json(SongSearchResponse {
        track,
        in_favourites,
        reviews,
        is_dj,
    }))
}

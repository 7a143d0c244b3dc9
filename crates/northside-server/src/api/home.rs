use axum::{extract::State, Extension, Json};
use sea_orm::EntityTrait;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::favourites::FavouriteResponse;
use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, AppError};
use crate::favourites;
use crate::lifecycle;
use crate::song_lookup::TrackInfo;
use crate::state::AppState;
use northside_db::entities::user;

#[derive(Debug, Serialize)]
pub struct CurrentEventSummary {
    pub id: Uuid,
    pub name: String,
    pub code: i32,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub username: String,
    pub in_event: bool,
    pub current_event: Option<CurrentEventSummary>,
    pub latest_favourite: Option<FavouriteResponse>,
    /// Song database details for `latest_favourite`, when the lookup succeeds.
    pub latest_favourite_track: Option<TrackInfo>,
}

/// GET /api/home
pub async fn home(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<HomeResponse>, ApiError> {
    let user_id = auth_user.0.sub;
    let me = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::UserNotFound)?;

    let current_event = lifecycle::current_membership(&state.db, user_id)
        .await?
        .map(|m| CurrentEventSummary {
            id: m.event.id,
            name: m.event.name,
            code: m.event.code,
        });

    let latest = favourites::latest_favourite(&state.db, user_id).await?;
    let latest_favourite_track = match &latest {
        Some(fav) => state.songs.search_track(&fav.song_name, &fav.artist_name).await,
        None => None,
    };

    Ok(Json(HomeResponse {
        username: me.username,
        in_event: me.in_event,
        current_event,
        latest_favourite: latest.map(FavouriteResponse::from),
        latest_favourite_track,
    }))
}

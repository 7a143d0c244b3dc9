use axum::{
    extract::{Path, Query, State},
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::favourites::FavouriteResponse;
use crate::error::{ApiError, AppError};
use crate::favourites;
use crate::lifecycle;
use crate::state::AppState;
use crate::storage::media_url;
use northside_db::entities::user;

#[derive(Debug, Serialize)]
pub struct PublicUserResponse {
    pub id: Uuid,
    pub username: String,
    pub about_me: Option<String>,
    pub avatar_url: Option<String>,
    pub in_event: bool,
}

impl From<user::Model> for PublicUserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            avatar_url: u.avatar_path.as_deref().map(media_url),
            username: u.username,
            about_me: u.about_me,
            in_event: u.in_event,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub user: PublicUserResponse,
    /// Name of the event the user is in right now.
    pub current_event: Option<String>,
    pub favourites: Vec<FavouriteResponse>,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchParams {
    pub username: String,
}

async fn find_by_username(state: &AppState, username: &str) -> Result<user::Model, AppError> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(&state.db)
        .await?
        .ok_or(AppError::UserNotFound)
}

/// GET /api/users/search?username=...
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserSearchParams>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    if params.username.trim().is_empty() {
        return Err(AppError::EmptyInput("username").into());
    }
    let found = find_by_username(&state, &params.username).await?;
    Ok(Json(found.into()))
}

/// GET /api/users/{username}
pub async fn get_user_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let found = find_by_username(&state, &username).await?;

    let current_event = lifecycle::current_membership(&state.db, found.id)
        .await?
        .map(|m| m.event.name);
    let favs = favourites::list_favourites(&state.db, found.id).await?;

    Ok(Json(UserProfileResponse {
        user: found.into(),
        current_event,
        favourites: favs.into_iter().map(FavouriteResponse::from).collect(),
    }))
}

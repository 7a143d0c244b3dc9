use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::EntityTrait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, AppError};
use crate::reviews::{self, ReviewView};
use crate::state::AppState;
use northside_db::entities::user;

#[derive(Debug, Deserialize)]
pub struct AddReviewRequest {
    pub track_id: String,
    pub body: String,
}

/// POST /api/reviews
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<ReviewView>), ApiError> {
    let review = reviews::add_review(&state.db, auth_user.0.sub, &body.track_id, &body.body).await?;
    // Token usernames go stale after a rename.
    let author = user::Entity::find_by_id(review.user_id)
        .one(&state.db)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::UserNotFound)?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewView {
            id: review.id,
            track_id: review.track_id,
            user_id: review.user_id,
            username: author.username,
            body: review.body,
            created_at: review.created_at,
        }),
    ))
}

/// DELETE /api/reviews/{id}: only the author may delete
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let review = reviews::find_review(&state.db, id).await?;
    if review.user_id != auth_user.0.sub {
        return Err(AppError::NotReviewAuthor.into());
    }
    reviews::delete_review(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/tracks/{track_id}/reviews
pub async fn track_reviews(
    State(state): State<Arc<AppState>>,
    Path(track_id): Path<String>,
) -> Result<Json<Vec<ReviewView>>, ApiError> {
    Ok(Json(reviews::reviews_for_track(&state.db, &track_id).await?))
}

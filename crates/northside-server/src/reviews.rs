use chrono::Utc;
use northside_db::entities::{song_review, user};
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_REVIEW_LEN: usize = 140;

/// A review with its author's current username.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub track_id: String,
    pub user_id: Uuid,
    pub username: String,
    pub body: String,
    pub created_at: DateTimeWithTimeZone,
}

pub async fn add_review(
    db: &DatabaseConnection,
    user_id: Uuid,
    track_id: &str,
    text: &str,
) -> Result<song_review::Model, AppError> {
    let track_id = track_id.trim();
    let body = text.trim();
    if track_id.is_empty() {
        return Err(AppError::EmptyInput("track id"));
    }
    if body.is_empty() {
        return Err(AppError::EmptyInput("review"));
    }
    if body.chars().count() > MAX_REVIEW_LEN {
        return Err(AppError::ReviewTooLong {
            max: MAX_REVIEW_LEN,
        });
    }

    let review = song_review::ActiveModel {
        id: Set(Uuid::new_v4()),
        track_id: Set(track_id.to_string()),
        user_id: Set(user_id),
        body: Set(body.to_string()),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(db)
    .await?;

    tracing::debug!(review_id = %review.id, track_id = %review.track_id, "review added");
    Ok(review)
}

pub async fn find_review(
    db: &DatabaseConnection,
    review_id: Uuid,
) -> Result<song_review::Model, AppError> {
    song_review::Entity::find_by_id(review_id)
        .one(db)
        .await?
        .ok_or(AppError::ReviewNotFound)
}

/// Deletes without checking authorship; callers decide who may delete.
pub async fn delete_review(db: &DatabaseConnection, review_id: Uuid) -> Result<(), AppError> {
    let res = song_review::Entity::delete_by_id(review_id).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(AppError::ReviewNotFound);
    }
    Ok(())
}

/// Newest first.
pub async fn reviews_for_track(
    db: &DatabaseConnection,
    track_id: &str,
) -> Result<Vec<ReviewView>, AppError> {
    let rows = song_review::Entity::find()
        .filter(song_review::Column::TrackId.eq(track_id))
        .order_by_desc(song_review::Column::CreatedAt)
        .find_also_related(user::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(r, u)| {
            u.map(|u| ReviewView {
                id: r.id,
                track_id: r.track_id,
                user_id: r.user_id,
                username: u.username,
                body: r.body,
                created_at: r.created_at,
            })
        })
        .collect())
}

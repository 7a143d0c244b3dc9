use chrono::Utc;
use northside_db::entities::favourite_song;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::voting::TrackRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FavouriteToggle {
    Added,
    Removed,
}

/// Favourite the track if it is not yet a favourite, otherwise remove it.
pub async fn toggle_favourite(
    db: &DatabaseConnection,
    user_id: Uuid,
    track: &TrackRef,
) -> Result<FavouriteToggle, AppError> {
    let track = track.normalized()?;
    let txn = db.begin().await?;

    let removed = favourite_song::Entity::delete_many()
        .filter(favourite_song::Column::UserId.eq(user_id))
        .filter(favourite_song::Column::TrackId.eq(&track.track_id))
        .exec(&txn)
        .await?;
    if removed.rows_affected > 0 {
        txn.commit().await?;
        tracing::debug!(user_id = %user_id, track_id = %track.track_id, "favourite removed");
        return Ok(FavouriteToggle::Removed);
    }

    let row = favourite_song::ActiveModel {
        user_id: Set(user_id),
        track_id: Set(track.track_id.clone()),
        song_name: Set(track.song_name),
        artist_name: Set(track.artist_name),
        created_at: Set(Utc::now().fixed_offset()),
    };
    favourite_song::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                favourite_song::Column::UserId,
                favourite_song::Column::TrackId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
    txn.commit().await?;

    tracing::debug!(user_id = %user_id, track_id = %track.track_id, "favourite added");
    Ok(FavouriteToggle::Added)
}

/// Newest first.
pub async fn list_favourites(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<favourite_song::Model>, AppError> {
    Ok(favourite_song::Entity::find()
        .filter(favourite_song::Column::UserId.eq(user_id))
        .order_by_desc(favourite_song::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn latest_favourite(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Option<favourite_song::Model>, AppError> {
    Ok(favourite_song::Entity::find()
        .filter(favourite_song::Column::UserId.eq(user_id))
        .order_by_desc(favourite_song::Column::CreatedAt)
        .one(db)
        .await?)
}

pub async fn is_favourite(
    db: &DatabaseConnection,
    user_id: Uuid,
    track_id: &str,
) -> Result<bool, AppError> {
    let count = favourite_song::Entity::find()
        .filter(favourite_song::Column::UserId.eq(user_id))
        .filter(favourite_song::Column::TrackId.eq(track_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

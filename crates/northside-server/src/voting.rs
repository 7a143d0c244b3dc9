use chrono::Utc;
use northside_db::entities::voted_song;
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::membership_of;

/// A track as identified by the song database, carried with its display names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackRef {
    pub track_id: String,
    pub song_name: String,
    pub artist_name: String,
}

impl TrackRef {
    pub(crate) fn normalized(&self) -> Result<TrackRef, AppError> {
        let field = |value: &str, name: &'static str| {
            let v = value.trim();
            if v.is_empty() {
                Err(AppError::EmptyInput(name))
            } else {
                Ok(v.to_string())
            }
        };
        Ok(TrackRef {
            track_id: field(&self.track_id, "track id")?,
            song_name: field(&self.song_name, "song name")?,
            artist_name: field(&self.artist_name, "artist name")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub track_id: String,
    pub song_name: String,
    pub artist_name: String,
    pub votes: u64,
    pub first_voted_at: DateTimeWithTimeZone,
}

pub async fn cast_vote(
    db: &DatabaseConnection,
    user_id: Uuid,
    event_id: Uuid,
    track: &TrackRef,
) -> Result<voted_song::Model, AppError> {
    let track = track.normalized()?;
    let txn = db.begin().await?;

    match membership_of(&txn, user_id).await? {
        Some(m) if m.event_id == event_id => {}
        _ => return Err(AppError::NotInEvent),
    }

    let vote = voted_song::Model {
        id: Uuid::new_v4(),
        event_id,
        user_id,
        track_id: track.track_id,
        song_name: track.song_name,
        artist_name: track.artist_name,
        created_at: Utc::now().fixed_offset(),
    };
    let row = voted_song::ActiveModel {
        id: Set(vote.id),
        event_id: Set(vote.event_id),
        user_id: Set(vote.user_id),
        track_id: Set(vote.track_id.clone()),
        song_name: Set(vote.song_name.clone()),
        artist_name: Set(vote.artist_name.clone()),
        created_at: Set(vote.created_at),
    };
    let inserted = voted_song::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                voted_song::Column::EventId,
                voted_song::Column::UserId,
                voted_song::Column::TrackId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
    if inserted == 0 {
        return Err(AppError::AlreadyVoted);
    }
    txn.commit().await?;

    tracing::debug!(event_id = %event_id, track_id = %vote.track_id, "vote recorded");
    Ok(vote)
}

pub async fn leaderboard<C: ConnectionTrait>(
    conn: &C,
    event_id: Uuid,
) -> Result<Vec<LeaderboardEntry>, DbErr> {
    let votes = voted_song::Entity::find()
        .filter(voted_song::Column::EventId.eq(event_id))
        .order_by_asc(voted_song::Column::CreatedAt)
        .all(conn)
        .await?;
    Ok(rank(&votes))
}

/// Tally votes per track. Most votes first; ties go to the track voted for
/// earliest, then to the lower track id.
pub fn rank(votes: &[voted_song::Model]) -> Vec<LeaderboardEntry> {
    let mut by_track: HashMap<&str, LeaderboardEntry> = HashMap::new();
    for v in votes {
        by_track
            .entry(v.track_id.as_str())
            .and_modify(|e| {
                e.votes += 1;
                if v.created_at < e.first_voted_at {
                    e.first_voted_at = v.created_at;
                }
            })
            .or_insert_with(|| LeaderboardEntry {
                track_id: v.track_id.clone(),
                song_name: v.song_name.clone(),
                artist_name: v.artist_name.clone(),
                votes: 1,
                first_voted_at: v.created_at,
            });
    }

    let mut entries: Vec<_> = by_track.into_values().collect();
    entries.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then(a.first_voted_at.cmp(&b.first_voted_at))
            .then_with(|| a.track_id.cmp(&b.track_id))
    });
    entries
}

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, AppError};
use crate::lifecycle;
use crate::state::AppState;
use crate::voting::{self, LeaderboardEntry, TrackRef};

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// Defaults to the event the voter is currently in.
    pub event_id: Option<Uuid>,
    #[serde(flatten)]
    pub track: TrackRef,
}

/// POST /api/votes: returns the updated leaderboard
pub async fn vote(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<VoteRequest>,
) -> Result<(StatusCode, Json<Vec<LeaderboardEntry>>), ApiError> {
    let user_id = auth_user.0.sub;
    let event_id = match body.event_id {
        Some(id) => id,
        None => {
            lifecycle::current_membership(&state.db, user_id)
                .await?
                .ok_or(AppError::NotInEvent)?
                .event
                .id
        }
    };

    voting::cast_vote(&state.db, user_id, event_id, &body.track).await?;
    let board = voting::leaderboard(&state.db, event_id)
        .await
        .map_err(AppError::from)?;
    Ok((StatusCode::CREATED, Json(board)))
}

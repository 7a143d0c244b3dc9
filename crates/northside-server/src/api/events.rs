use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, AppError};
use crate::lifecycle::{self, CurrentMembership, EventDetail, NewEvent};
use crate::state::AppState;
use crate::voting::LeaderboardEntry;
use northside_db::entities::event;

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub code: i32,
    pub location: String,
    pub description: Option<String>,
    pub dj_username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventStatusRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct JoinEventRequest {
    pub code: i32,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub name: String,
    pub code: i32,
    pub is_active: bool,
    pub location: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<event::Model> for EventResponse {
    fn from(e: event::Model) -> Self {
        Self {
            id: e.id,
            name: e.name,
            code: e.code,
            is_active: e.is_active,
            location: e.location,
            description: e.description,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentEventResponse {
    pub in_event: bool,
    pub event: Option<EventResponse>,
    pub is_admin: bool,
    pub is_dj: bool,
}

impl From<Option<CurrentMembership>> for CurrentEventResponse {
    fn from(m: Option<CurrentMembership>) -> Self {
        match m {
            Some(m) => Self {
                in_event: true,
                event: Some(m.event.into()),
                is_admin: m.is_admin,
                is_dj: m.is_dj,
            },
            None => Self {
                in_event: false,
                event: None,
                is_admin: false,
                is_dj: false,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventDetailResponse {
    #[serde(flatten)]
    pub event: EventResponse,
    pub admin: Option<String>,
    pub dj: Option<String>,
    pub members: Vec<String>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl From<EventDetail> for EventDetailResponse {
    fn from(d: EventDetail) -> Self {
        Self {
            event: d.event.into(),
            admin: d.admin,
            dj: d.dj,
            members: d.members,
            leaderboard: d.leaderboard,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeaveEventResponse {
    /// True when the admin left and the event was ended for everyone.
    pub event_ended: bool,
}

/// POST /api/events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    let created = lifecycle::create_event(
        &state.db,
        auth_user.0.sub,
        NewEvent {
            name: body.name,
            code: body.code,
            location: body.location,
            description: body.description,
            dj_username: body.dj_username,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/events/mine
pub async fn my_events(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let events = lifecycle::owned_events(&state.db, auth_user.0.sub).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

/// GET /api/events/current
pub async fn current_event(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<CurrentEventResponse>, ApiError> {
    let membership = lifecycle::current_membership(&state.db, auth_user.0.sub).await?;
    Ok(Json(membership.into()))
}

/// PUT /api/events/{id}/status
pub async fn set_event_status(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<EventStatusRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    if body.active {
        let ev = lifecycle::activate_event(&state.db, id, auth_user.0.sub).await?;
        return Ok(Json(ev.into()));
    }

    lifecycle::deactivate_event(&state.db, &state.history, id, auth_user.0.sub).await?;
    let ev = event::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::EventNotFound)?;
    Ok(Json(ev.into()))
}

/// POST /api/events/join
pub async fn join_event(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<JoinEventRequest>,
) -> Result<Json<CurrentEventResponse>, ApiError> {
    let membership = lifecycle::join_event(&state.db, auth_user.0.sub, body.code).await?;
    Ok(Json(Some(membership).into()))
}

/// POST /api/events/leave
pub async fn leave_event(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<LeaveEventResponse>, ApiError> {
    let ended = lifecycle::leave_event(&state.db, &state.history, auth_user.0.sub).await?;
    Ok(Json(LeaveEventResponse {
        event_ended: ended.is_some(),
    }))
}

/// GET /api/events/{id}
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventDetailResponse>, ApiError> {
    let detail = lifecycle::event_detail(&state.db, id, auth_user.0.sub).await?;
    Ok(Json(detail.into()))
}

/// DELETE /api/events/{id}
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    lifecycle::delete_event(&state.db, id, auth_user.0.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/events/{id}/leaderboard
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let board = lifecycle::event_leaderboard(&state.db, id, auth_user.0.sub).await?;
    Ok(Json(board))
}

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::jwt::{generate_token_pair, validate_refresh_token, TokenPair};
use super::middleware::AuthUser;
use super::password::{check_new_password, hash_password, verify_password};
use crate::error::{api_error, ApiError, AppError};
use crate::state::AppState;
use crate::storage::{media_url, StorageError};
use northside_db::entities::user;

pub const MAX_ABOUT_ME_LEN: usize = 140;
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

// ─── Request/Response DTOs ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub about_me: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub about_me: Option<String>,
    pub avatar_url: Option<String>,
    pub in_event: bool,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            avatar_url: u.avatar_path.as_deref().map(media_url),
            username: u.username,
            email: u.email,
            about_me: u.about_me,
            in_event: u.in_event,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

// ─── Validation ────────────────────────────────────────────────────

pub(crate) fn validate_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    let len = username.chars().count();
    if !(3..=64).contains(&len) {
        return Err(AppError::Validation(
            "Username must be between 3 and 64 characters".to_string(),
        ));
    }
    if username.contains(['@', '/', ' ']) {
        return Err(AppError::Validation(
            "Username cannot contain @, / or spaces".to_string(),
        ));
    }
    Ok(username.to_string())
}

fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim();
    let valid = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    Ok(email.to_string())
}

fn conflict_or_db(e: DbErr, msg: &str) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(msg.to_string()),
        _ => AppError::Database(e),
    }
}

fn issue_tokens(state: &AppState, u: &user::Model) -> Result<TokenPair, AppError> {
    generate_token_pair(u.id, &u.username, &state.jwt_secret)
        .map_err(|e| AppError::Internal(format!("token error: {e}")))
}

async fn load_user(state: &AppState, user_id: Uuid) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::UserNotFound)
}

// ─── Handlers ──────────────────────────────────────────────────────

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = validate_username(&body.username)?;
    let email = validate_email(&body.email)?;
    check_new_password(&body.password, &body.password_confirm)?;

    let existing = user::Entity::find()
        .filter(
            user::Column::Username
                .eq(&username)
                .or(user::Column::Email.eq(&email)),
        )
        .one(&state.db)
        .await
        .map_err(AppError::from)?;
    if existing.is_some() {
        return Err(AppError::Conflict("Username or email already taken".to_string()).into());
    }

    let password_hash = hash_password(&body.password)
        .map_err(|e| AppError::Internal(format!("hash error: {e}")))?;

    let now = chrono::Utc::now().fixed_offset();
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(email),
        password_hash: Set(password_hash),
        about_me: Set(None),
        in_event: Set(false),
        avatar_path: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|e| conflict_or_db(e, "Username or email already taken"))?;

    let tokens = issue_tokens(&state, &created)?;
    tracing::info!(user_id = %created.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: created.into(),
            tokens,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = user::Entity::find()
        .filter(user::Column::Username.eq(body.username.trim()))
        .one(&state.db)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::InvalidCredentials)?;

    let valid = verify_password(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("verify error: {e}")))?;
    if !valid {
        return Err(AppError::InvalidCredentials.into());
    }

    let tokens = issue_tokens(&state, &user)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let claims = validate_refresh_token(&body.refresh_token, &state.jwt_secret).ok_or_else(|| {
        api_error(StatusCode::UNAUTHORIZED, "Invalid or expired refresh token")
    })?;

    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "User no longer exists"))?;

    Ok(Json(issue_tokens(&state, &user)?))
}

/// POST /api/auth/logout (requires auth)
///
/// Tokens are stateless; the client drops them.
pub async fn logout(Extension(auth_user): Extension<AuthUser>) -> StatusCode {
    tracing::info!(user_id = %auth_user.0.sub, "user logged out");
    StatusCode::NO_CONTENT
}

/// GET /api/auth/me (requires auth)
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(&state, auth_user.0.sub).await?;
    Ok(Json(user.into()))
}

/// PUT /api/auth/profile (requires auth)
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let found = load_user(&state, auth_user.0.sub).await?;
    let mut update: user::ActiveModel = found.clone().into();

    if let Some(raw) = body.username.as_deref() {
        let username = validate_username(raw)?;
        if username != found.username {
            let taken = user::Entity::find()
                .filter(user::Column::Username.eq(&username))
                .filter(user::Column::Id.ne(found.id))
                .one(&state.db)
                .await
                .map_err(AppError::from)?;
            if taken.is_some() {
                return Err(AppError::Conflict("Username already taken".to_string()).into());
            }
            update.username = Set(username);
        }
    }

    if let Some(about) = body.about_me.as_deref() {
        let about = about.trim();
        if about.chars().count() > MAX_ABOUT_ME_LEN {
            return Err(AppError::Validation(format!(
                "About me must be at most {MAX_ABOUT_ME_LEN} characters"
            ))
            .into());
        }
        update.about_me = Set((!about.is_empty()).then(|| about.to_string()));
    }

    update.updated_at = Set(chrono::Utc::now().fixed_offset());
    let updated = update
        .update(&state.db)
        .await
        .map_err(|e| conflict_or_db(e, "Username already taken"))?;

    tracing::info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated.into()))
}

/// POST /api/auth/avatar (requires auth), multipart field `file` or `avatar`
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" || name == "avatar" {
            let filename = field.file_name().unwrap_or("avatar").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Read error: {e}")))?;
            upload = Some((filename, data.to_vec()));
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No file provided"))?;
    if data.len() > MAX_AVATAR_BYTES {
        return Err(api_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Profile pictures are limited to 5 MB",
        ));
    }

    let found = load_user(&state, auth_user.0.sub).await?;
    let relative = state
        .storage
        .store_avatar(found.id, &filename, &data)
        .await
        .map_err(|e| match e {
            StorageError::UnsupportedImage => api_error(
                StatusCode::BAD_REQUEST,
                "Only JPEG, PNG or WebP images are accepted",
            ),
            StorageError::Io(e) => AppError::Internal(format!("storage error: {e}")).into(),
        })?;

    let previous = found.avatar_path.clone();
    let mut update: user::ActiveModel = found.into();
    update.avatar_path = Set(Some(relative.clone()));
    update.updated_at = Set(chrono::Utc::now().fixed_offset());
    let updated = match update.update(&state.db).await {
        Ok(u) => u,
        Err(e) => {
            let _ = state.storage.delete_file(&relative).await;
            return Err(AppError::from(e).into());
        }
    };

    if let Some(old) = previous {
        if let Err(e) = state.storage.delete_file(&old).await {
            tracing::warn!(path = %old, "failed to remove previous avatar: {e}");
        }
    }

    tracing::info!(user_id = %updated.id, "avatar updated");
    Ok(Json(updated.into()))
}

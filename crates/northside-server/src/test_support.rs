// Shared fixtures for the in-crate tests.
use chrono::Utc;
use northside_db::entities::{event_member, user};
use northside_migration::Migrator;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use uuid::Uuid;

use crate::history_log::HistoryLog;
use crate::song_lookup::AudioDbClient;
use crate::state::AppState;
use crate::storage::MediaStorage;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-testing-only";

/// Fresh in-memory database with every migration applied.
///
/// A single pooled connection keeps the in-memory database alive and shared.
pub async fn test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn seed_user(db: &DatabaseConnection, username: &str) -> user::Model {
    let now = Utc::now().fixed_offset();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set("$argon2id$not-a-real-hash".to_string()),
        about_me: Set(None),
        in_event: Set(false),
        avatar_path: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn reload_user(db: &DatabaseConnection, id: Uuid) -> user::Model {
    user::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
}

pub async fn member_count(db: &DatabaseConnection) -> usize {
    event_member::Entity::find().all(db).await.unwrap().len()
}

/// Test state with history disabled and the song client pointed at `songs_url`.
pub fn test_app_state(
    db: DatabaseConnection,
    tmp_dir: &std::path::Path,
    songs_url: &str,
) -> Arc<AppState> {
    Arc::new(AppState {
        db,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        storage: MediaStorage::new(tmp_dir),
        history: HistoryLog::disabled(),
        songs: AudioDbClient::with_base_url(songs_url),
    })
}

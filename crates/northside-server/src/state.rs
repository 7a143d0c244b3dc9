use sea_orm::DatabaseConnection;

use crate::history_log::HistoryLog;
use crate::song_lookup::AudioDbClient;
use crate::storage::MediaStorage;

/// Shared application state, handed to every handler as `Arc<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt_secret: String,
    pub storage: MediaStorage,
    pub history: HistoryLog,
    pub songs: AudioDbClient,
}

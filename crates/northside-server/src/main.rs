use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod api;
mod auth;
mod config;
mod error;
mod favourites;
mod history_log;
mod lifecycle;
mod reviews;
mod song_lookup;
mod state;
mod storage;
mod voting;

#[cfg(test)]
mod test_support;

use config::ServerConfig;
use history_log::HistoryLog;
use song_lookup::AudioDbClient;
use state::AppState;
use storage::MediaStorage;

#[derive(Serialize)]
struct ApiStatus {
    status: &'static str,
    version: &'static str,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env();

    // SECURITY: warn if JWT secret is the default fallback
    if config.uses_default_jwt_secret() {
        tracing::error!(
            "JWT_SECRET is set to a known default value! \
             Set JWT_SECRET to a strong random string (≥32 chars) in production."
        );
        if config.production {
            panic!("Refusing to start: JWT_SECRET must be set to a secure value in production.");
        }
    }

    // Database connection
    let db_config = northside_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = northside_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("running database migrations...");
    northside_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");

    tracing::info!(domain = %config.domain, uploads = %config.upload_path.display(), "instance configured");

    let state = Arc::new(AppState {
        db,
        jwt_secret: config.jwt_secret.clone(),
        storage: MediaStorage::new(&config.upload_path),
        history: HistoryLog::new(&config.history_path),
        songs: AudioDbClient::new(&config.audiodb_api_key, &config.audiodb_base_url),
    });

    let app = build_router(state, &config);

    tracing::info!(addr = %config.bind_addr, "server started");
    axum::serve(
        tokio::net::TcpListener::bind(config.bind_addr)
            .await
            .expect("failed to bind listener"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}

fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    // Rate limiter for auth endpoints
    let auth_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(6)
            .burst_size(10)
            .finish()
            .expect("failed to build rate limiter config"),
    );

    // Auth routes (public, rate-limited)
    let auth_public = Router::new()
        .route("/register", post(auth::routes::register))
        .route("/login", post(auth::routes::login))
        .route("/refresh", post(auth::routes::refresh))
        .layer(GovernorLayer::new(auth_governor_conf));

    // Auth routes (protected)
    let auth_protected = Router::new()
        .route("/logout", post(auth::routes::logout))
        .route("/me", get(auth::routes::me))
        .route("/profile", put(auth::routes::update_profile))
        .route(
            "/avatar",
            post(auth::routes::upload_avatar).layer(DefaultBodyLimit::max(6 * 1024 * 1024)),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let protected_api = Router::new()
        .route("/home", get(api::home::home))
        .route("/users/search", get(api::users::search_users))
        .route("/users/{username}", get(api::users::get_user_profile))
        .route("/events", post(api::events::create_event))
        .route("/events/mine", get(api::events::my_events))
        .route("/events/current", get(api::events::current_event))
        .route("/events/join", post(api::events::join_event))
        .route("/events/leave", post(api::events::leave_event))
        .route(
            "/events/{id}",
            get(api::events::get_event).delete(api::events::delete_event),
        )
        .route("/events/{id}/status", put(api::events::set_event_status))
        .route("/events/{id}/leaderboard", get(api::events::leaderboard))
        .route("/search", get(api::search::search_song))
        .route(
            "/favourites",
            get(api::favourites::list_favourites).post(api::favourites::toggle_favourite),
        )
        .route("/votes", post(api::votes::vote))
        .route("/reviews", post(api::reviews::add_review))
        .route("/reviews/{id}", axum::routing::delete(api::reviews::delete_review))
        .route("/tracks/{track_id}/reviews", get(api::reviews::track_reviews))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_protected))
        .merge(protected_api);

    // CORS: restrict to configured origins
    let methods = [
        axum::http::Method::GET,
        axum::http::Method::POST,
        axum::http::Method::PUT,
        axum::http::Method::DELETE,
        axum::http::Method::OPTIONS,
    ];
    let cors = if config.cors_origins.is_empty() {
        tracing::warn!("CORS_ORIGINS not set, allowing same-origin requests only");
        CorsLayer::new().allow_origin(AllowOrigin::exact(
            HeaderValue::from_str(&config.public_origin())
                .unwrap_or_else(|_| HeaderValue::from_static("https://localhost")),
        ))
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        tracing::info!("CORS allowed origins: {:?}", origins);
        CorsLayer::new().allow_origin(origins)
    }
    .allow_methods(methods)
    .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .nest_service("/media", ServeDir::new(&config.upload_path))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

async fn healthz() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn config(upload_path: &std::path::Path) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: test_support::TEST_JWT_SECRET.to_string(),
            production: false,
            domain: "localhost:8080".to_string(),
            scheme: "http".to_string(),
            cors_origins: vec![],
            upload_path: upload_path.to_path_buf(),
            history_path: upload_path.join("history"),
            audiodb_api_key: "test".to_string(),
            audiodb_base_url: "http://127.0.0.1:1".to_string(),
        }
    }

    async fn app(tmp: &TempDir) -> Router {
        let db = test_support::test_db().await;
        let state = test_support::test_app_state(db, tmp.path(), "http://127.0.0.1:1");
        build_router(state, &config(tmp.path()))
    }

    #[tokio::test]
    async fn test_healthz_with_security_headers() {
        let tmp = TempDir::new().unwrap();
        let resp = app(&tmp)
            .await
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
        assert_eq!(resp.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let tmp = TempDir::new().unwrap();
        let app = app(&tmp).await;
        for uri in ["/api/home", "/api/events/mine", "/api/favourites", "/api/auth/me"] {
            let resp = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_media_served_from_upload_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("avatars")).unwrap();
        std::fs::write(tmp.path().join("avatars/me.png"), b"png").unwrap();

        let resp = app(&tmp)
            .await
            .oneshot(
                Request::builder()
                    .uri("/media/avatars/me.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

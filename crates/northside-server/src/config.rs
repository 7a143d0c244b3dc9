use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEV_JWT_SECRET: &str = "dev-secret-change-me-in-production";

/// TheAudioDB's public test key.
const DEFAULT_AUDIODB_KEY: &str = "523532";
pub const DEFAULT_AUDIODB_BASE_URL: &str = "https://theaudiodb.com/api/v1/json";

/// Runtime settings, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub production: bool,
    pub domain: String,
    pub scheme: String,
    pub cors_origins: Vec<String>,
    pub upload_path: PathBuf,
    pub history_path: PathBuf,
    pub audiodb_api_key: String,
    pub audiodb_base_url: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = env::var("NORTHSIDE_BIND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            bind_addr,
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            production: env::var("NORTHSIDE_ENV").unwrap_or_default() == "production",
            domain: env::var("NORTHSIDE_DOMAIN").unwrap_or_else(|_| "localhost:8080".to_string()),
            scheme: env::var("NORTHSIDE_SCHEME").unwrap_or_else(|_| "https".to_string()),
            cors_origins,
            upload_path: env::var("UPLOAD_PATH")
                .unwrap_or_else(|_| "./data/uploads".to_string())
                .into(),
            history_path: env::var("HISTORY_PATH")
                .unwrap_or_else(|_| "./data/history".to_string())
                .into(),
            audiodb_api_key: env::var("AUDIODB_API_KEY")
                .unwrap_or_else(|_| DEFAULT_AUDIODB_KEY.to_string()),
            audiodb_base_url: env::var("AUDIODB_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_AUDIODB_BASE_URL.to_string()),
        }
    }

    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
            || self.jwt_secret == "change-me-to-a-secure-random-string"
    }

    pub fn public_origin(&self) -> String {
        format!("{}://{}", self.scheme, self.domain)
    }
}

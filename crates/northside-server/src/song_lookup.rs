//! TheAudioDB client used by song search, favourites and the home page.
//!
//! A lookup is a single `searchtrack.php` request. Every failure, whether
//! transport, HTTP status, malformed body or an empty result, collapses
//! into `None`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "NorthsideDJs/0.1.0";

/// The first track TheAudioDB returned for a song/artist pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    pub track_id: String,
    pub song_name: String,
    pub artist_name: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_ms: Option<u64>,
}

// ── Internal API response types ─────────────────────────────────

#[derive(Deserialize)]
struct SearchTrackResponse {
    track: Option<Vec<AdbTrack>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdbTrack {
    id_track: String,
    str_track: String,
    str_artist: String,
    str_album: Option<String>,
    str_genre: Option<String>,
    str_track_thumb: Option<String>,
    /// Sent as a string of milliseconds.
    int_duration: Option<String>,
}

impl From<AdbTrack> for TrackInfo {
    fn from(t: AdbTrack) -> Self {
        Self {
            track_id: t.id_track,
            song_name: t.str_track,
            artist_name: t.str_artist,
            album: t.str_album.filter(|s| !s.is_empty()),
            genre: t.str_genre.filter(|s| !s.is_empty()),
            thumbnail_url: t.str_track_thumb.filter(|s| !s.is_empty()),
            duration_ms: t.int_duration.and_then(|d| d.trim().parse().ok()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioDbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AudioDbClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create a client pointing at a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.to_string(),
            api_key: "test".to_string(),
        }
    }

    fn search_url(&self, song: &str, artist: &str) -> String {
        format!(
            "{}/{}/searchtrack.php?s={}&t={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(artist.trim()),
            urlencoding::encode(song.trim())
        )
    }

    pub async fn search_track(&self, song: &str, artist: &str) -> Option<TrackInfo> {
        if song.trim().is_empty() || artist.trim().is_empty() {
            return None;
        }

        debug!(song = song, artist = artist, "querying TheAudioDB");

        let resp = match self.http.get(self.search_url(song, artist)).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("TheAudioDB request failed: {e}");
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "TheAudioDB returned error");
            return None;
        }

        let body: SearchTrackResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!("TheAudioDB response parse error: {e}");
                return None;
            }
        };

        let track = body.track.and_then(|tracks| tracks.into_iter().next());
        if track.is_none() {
            debug!(song = song, artist = artist, "no track found");
        }
        track.map(TrackInfo::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn track_json() -> serde_json::Value {
        serde_json::json!({
            "track": [{
                "idTrack": "32793500",
                "strTrack": "Around the World",
                "strArtist": "Daft Punk",
                "strAlbum": "Homework",
                "strGenre": "House",
                "strTrackThumb": "",
                "intDuration": "429000"
            }, {
                "idTrack": "1",
                "strTrack": "Around the World (Radio Edit)",
                "strArtist": "Daft Punk"
            }]
        })
    }

    #[test]
    fn test_search_url_encodes_terms() {
        let client = AudioDbClient::new("523532", "https://theaudiodb.com/api/v1/json/");
        assert_eq!(
            client.search_url("Around the World ", "Daft Punk"),
            "https://theaudiodb.com/api/v1/json/523532/searchtrack.php?s=Daft%20Punk&t=Around%20the%20World"
        );
    }

    #[test]
    fn test_track_conversion_drops_empty_fields() {
        let raw: SearchTrackResponse = serde_json::from_value(track_json()).unwrap();
        let info = TrackInfo::from(raw.track.unwrap().remove(0));
        assert_eq!(info.track_id, "32793500");
        assert_eq!(info.album.as_deref(), Some("Homework"));
        assert!(info.thumbnail_url.is_none());
        assert_eq!(info.duration_ms, Some(429_000));
    }

    #[test]
    fn test_null_track_deserializes() {
        let raw: SearchTrackResponse =
            serde_json::from_value(serde_json::json!({ "track": null })).unwrap();
        assert!(raw.track.is_none());
    }

    #[tokio::test]
    async fn test_search_track_returns_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test/searchtrack.php"))
            .and(query_param("s", "Daft Punk"))
            .and(query_param("t", "Around the World"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = AudioDbClient::with_base_url(&server.uri());
        let info = client
            .search_track("Around the World", "Daft Punk")
            .await
            .unwrap();
        assert_eq!(info.song_name, "Around the World");
        assert_eq!(info.artist_name, "Daft Punk");
        assert_eq!(info.genre.as_deref(), Some("House"));
    }

    #[tokio::test]
    async fn test_search_track_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "track": null })),
            )
            .mount(&server)
            .await;

        let client = AudioDbClient::with_base_url(&server.uri());
        assert!(client.search_track("Nope", "Nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_search_track_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = AudioDbClient::with_base_url(&server.uri());
        assert!(client.search_track("Song", "Artist").await.is_none());
    }

    #[tokio::test]
    async fn test_search_track_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = AudioDbClient::with_base_url(&server.uri());
        assert!(client.search_track("Song", "Artist").await.is_none());
    }

    #[tokio::test]
    async fn test_search_track_connection_failure() {
        let client = AudioDbClient::with_base_url("http://127.0.0.1:1");
        assert!(client.search_track("Song", "Artist").await.is_none());
    }

    #[tokio::test]
    async fn test_blank_terms_skip_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track_json()))
            .expect(0)
            .mount(&server)
            .await;

        let client = AudioDbClient::with_base_url(&server.uri());
        assert!(client.search_track("  ", "Daft Punk").await.is_none());
    }
}

//! Local stand-in for the SoundCloud web player, api-v2 and the YouTube
//! player endpoint, bound to an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use medialink::config::{HttpConfig, SoundCloudConfig, YouTubeConfig};
use medialink::{HttpClient, SoundCloud, SystemClock, YouTube};

#[derive(Default)]
pub struct Upstream {
    pub base: String,
    /// Credentialed calls still to be answered with 401.
    pub reject_next: AtomicUsize,
    /// Resolve calls still to be answered with 503.
    pub fail_next: AtomicUsize,
    /// Media exchanges still to be answered with 401, after the credential
    /// check has passed.
    pub reject_media: AtomicUsize,
    pub scrapes: AtomicUsize,
    pub search_pages: AtomicUsize,
    /// `client_id` of every credentialed request, in arrival order.
    pub client_ids: Mutex<Vec<String>>,
    /// Query strings the media endpoint saw.
    pub media_queries: Mutex<Vec<HashMap<String, String>>>,
}

impl Upstream {
    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn credential_check(&self, query: &HashMap<String, String>) -> Option<Response> {
        let Some(id) = query.get("client_id") else {
            return Some(StatusCode::UNAUTHORIZED.into_response());
        };
        self.client_ids.lock().push(id.clone());
        if Self::take(&self.reject_next) {
            return Some(StatusCode::UNAUTHORIZED.into_response());
        }
        None
    }

    pub fn soundcloud_config(&self) -> SoundCloudConfig {
        SoundCloudConfig {
            landing_url: format!("{}/", self.base),
            cdn_host: "127.0.0.1".into(),
            api_base: self.base.clone(),
            ..SoundCloudConfig::default()
        }
    }

    pub fn youtube_config(&self) -> YouTubeConfig {
        YouTubeConfig {
            player_endpoint: format!("{}/youtubei/v1/player", self.base),
            ..YouTubeConfig::default()
        }
    }

    pub fn soundcloud(&self) -> SoundCloud {
        self.soundcloud_with(self.soundcloud_config())
    }

    pub fn soundcloud_with(&self, config: SoundCloudConfig) -> SoundCloud {
        SoundCloud::new(http(), &config, Arc::new(SystemClock))
    }

    pub fn youtube(&self) -> YouTube {
        YouTube::new(http(), self.youtube_config())
    }
}

pub fn http() -> HttpClient {
    HttpClient::new(&HttpConfig::default()).unwrap()
}

/// Start the mock on `127.0.0.1:0`.
pub async fn spawn_upstream() -> Arc<Upstream> {
    spawn_upstream_with(|_| {}).await
}

pub async fn spawn_upstream_with(setup: impl FnOnce(&mut Upstream)) -> Arc<Upstream> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut upstream = Upstream {
        base: format!("http://{addr}"),
        ..Upstream::default()
    };
    setup(&mut upstream);
    let upstream = Arc::new(upstream);

    let app = Router::new()
        .route("/", get(landing))
        .route("/empty", get(|| async { Html("<html><body>nothing here</body></html>") }))
        .route("/assets/{name}", get(script))
        .route("/resolve", get(resolve))
        .route("/search/tracks", get(search))
        .route("/media/{id}/{protocol}", get(media))
        .route("/youtubei/v1/player", post(player))
        .with_state(Arc::clone(&upstream));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    upstream
}

async fn landing() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html><html><head>
<script crossorigin src="/assets/vendor.js"></script>
<script src="https://www.google-analytics.com/analytics.js"></script>
</head><body>
<script crossorigin src="/assets/app.js"></script>
<script crossorigin src="/assets/missing.js"></script>
</body></html>"#,
    )
}

async fn script(State(up): State<Arc<Upstream>>, Path(name): Path<String>) -> Response {
    match name.as_str() {
        "vendor.js" => "var React = {};".into_response(),
        "app.js" => {
            let n = up.scrapes.fetch_add(1, Ordering::SeqCst) + 1;
            format!(r#"(function(){{var c={{client_id:"{n:0>32}",env:"test"}};}})();"#)
                .into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn track_json(base: &str, id: u64, username: Option<&str>) -> Value {
    json!({
        "kind": "track",
        "id": id,
        "title": format!("Track {id}"),
        "permalink_url": format!("https://soundcloud.com/artist/track-{id}"),
        "duration": 180_000,
        "artwork_url": null,
        "track_authorization": format!("auth-{id}"),
        "user": { "username": username, "full_name": "The Artist" },
        "media": { "transcodings": [
            {
                "url": format!("{base}/media/{id}/hls"),
                "preset": "mp3_1_0",
                "quality": "sq",
                "format": { "protocol": "hls", "mime_type": "audio/mpeg" }
            },
            {
                "url": format!("{base}/media/{id}/progressive"),
                "preset": "mp3_1_0",
                "quality": "sq",
                "format": { "protocol": "progressive", "mime_type": "audio/mpeg" }
            }
        ]}
    })
}

async fn resolve(
    State(up): State<Arc<Upstream>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(rejection) = up.credential_check(&query) {
        return rejection;
    }
    if Upstream::take(&up.fail_next) {
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }

    let url = query.get("url").cloned().unwrap_or_default();
    if url.contains("deleted") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if url.contains("vanished") {
        return Json(Value::Null).into_response();
    }
    if url.contains("hollow") {
        return Json(json!({})).into_response();
    }
    if url.contains("/sets/") {
        return Json(json!({ "kind": "playlist", "id": 99, "title": "A set" })).into_response();
    }
    if url.contains("hls-only") {
        let mut track = track_json(&up.base, 7, Some("artist"));
        track["media"]["transcodings"] = json!([]);
        return Json(track).into_response();
    }
    Json(track_json(&up.base, 1, Some("artist"))).into_response()
}

/// Two pages of two tracks; track 3 has no username.
async fn search(
    State(up): State<Arc<Upstream>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(rejection) = up.credential_check(&query) {
        return rejection;
    }
    up.search_pages.fetch_add(1, Ordering::SeqCst);

    let q = query.get("q").cloned().unwrap_or_default();
    if q == "nothing" {
        return Json(json!({ "collection": [], "next_href": null })).into_response();
    }

    let base = &up.base;
    let page = match query.get("offset").map(String::as_str) {
        Some("2") => json!({
            "collection": [track_json(base, 3, None), track_json(base, 4, Some("d"))],
            "next_href": null
        }),
        _ => json!({
            "collection": [track_json(base, 1, Some("a")), track_json(base, 2, Some("b"))],
            "next_href": format!("{base}/search/tracks?q={q}&offset=2&client_id=stale")
        }),
    };
    Json(page).into_response()
}

async fn media(
    State(up): State<Arc<Upstream>>,
    Path((id, protocol)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(rejection) = up.credential_check(&query) {
        return rejection;
    }
    if Upstream::take(&up.reject_media) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    up.media_queries.lock().push(query);
    Json(json!({ "url": format!("https://cf-media.example/{id}.{protocol}.mp3?Policy=signed") }))
        .into_response()
}

async fn player(Json(body): Json<Value>) -> Response {
    let id = body["videoId"].as_str().unwrap_or_default().to_string();
    if id == "unavailable" {
        return Json(json!({
            "playabilityStatus": { "status": "ERROR", "reason": "Video unavailable" }
        }))
        .into_response();
    }
    Json(json!({
        "playabilityStatus": { "status": "OK" },
        "videoDetails": {
            "videoId": id,
            "title": "Test Video",
            "lengthSeconds": "90",
            "author": "Test Channel"
        },
        "streamingData": {
            "formats": [
                { "itag": 18, "url": "https://rr.example/18", "mimeType": "video/mp4; codecs=\"avc1, mp4a\"",
                  "bitrate": 500_000, "height": 360, "qualityLabel": "360p", "audioQuality": "AUDIO_QUALITY_LOW" },
                { "itag": 22, "url": "https://rr.example/22", "mimeType": "video/mp4; codecs=\"avc1, mp4a\"",
                  "bitrate": 1_500_000, "height": 720, "qualityLabel": "720p", "audioQuality": "AUDIO_QUALITY_MEDIUM" }
            ],
            "adaptiveFormats": [
                { "itag": 140, "url": "https://rr.example/140", "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                  "bitrate": 128_000, "audioQuality": "AUDIO_QUALITY_MEDIUM" }
            ]
        }
    }))
    .into_response()
}

//! YouTube format resolution via the innertube player endpoint.
//!
//! One POST per video returns `videoDetails` plus `streamingData`. Muxed
//! (`formats`) and split (`adaptiveFormats`) encodings are all normalized
//! into [`Variant`]s and handed to the shared selector. Formats that only
//! carry a `signatureCipher` have no usable URL and are kept for listing but
//! never selected.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::YouTubeConfig;
use crate::error::{ResolveError, Result};
use crate::http_client::HttpClient;
use crate::model::{container_from_mime, Protocol, Variant, VideoInfo};
use crate::select::{select, Preference, StreamQuality};

static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/|/live/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)")
        .expect("static regex")
});

/// Pull the 11-character video id out of any common YouTube URL shape.
pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A single format chosen for playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedFormat {
    pub title: String,
    pub variant: Variant,
}

impl SelectedFormat {
    pub fn url(&self) -> &str {
        self.variant.source_url.as_deref().unwrap_or_default()
    }
}

/// YouTube player client.
pub struct YouTube {
    http: HttpClient,
    config: YouTubeConfig,
}

impl YouTube {
    pub fn new(http: HttpClient, config: YouTubeConfig) -> Self {
        Self { http, config }
    }

    /// Details and every format offered for `url`.
    #[instrument(skip(self))]
    pub async fn info(&self, url: &str) -> Result<VideoInfo> {
        let id = extract_video_id(url)
            .ok_or_else(|| ResolveError::Validation(format!("Not a YouTube video URL: {url}")))?;

        let body = json!({
            "videoId": id,
            "context": {
                "client": {
                    "clientName": self.config.client_name,
                    "clientVersion": self.config.client_version,
                    "androidSdkVersion": self.config.android_sdk_version,
                    "hl": "en",
                    "gl": "US",
                }
            },
            "contentCheckOk": true,
            "racyCheckOk": true,
        });

        let reply: PlayerResponse = self
            .http
            .post_json(&self.config.player_endpoint, &body)
            .await?;
        let info = parse_player_response(id, reply)?;
        debug!(formats = info.formats.len(), "Player response parsed");
        Ok(info)
    }

    /// Best muxed audio+video format no taller than `quality`.
    pub async fn video(&self, url: &str, quality: StreamQuality) -> Result<SelectedFormat> {
        let info = self.info(url).await?;
        let variant = select(&info.formats, Preference::Video(quality))?.clone();
        Ok(SelectedFormat {
            title: info.title,
            variant,
        })
    }

    /// Highest-bitrate audio-only format.
    pub async fn audio(&self, url: &str) -> Result<SelectedFormat> {
        let info = self.info(url).await?;
        let variant = select(&info.formats, Preference::AudioOnly)?.clone();
        Ok(SelectedFormat {
            title: info.title,
            variant,
        })
    }
}

/// Normalize a raw player reply into a [`VideoInfo`].
fn parse_player_response(id: &str, reply: PlayerResponse) -> Result<VideoInfo> {
    if let Some(status) = reply.playability_status {
        match status.status.as_deref() {
            Some("OK") | None => {}
            Some("ERROR") => return Err(ResolveError::NotFound),
            Some(other) => {
                let reason = status.reason.unwrap_or_else(|| other.to_string());
                return Err(ResolveError::upstream(None, format!("video unplayable: {reason}")));
            }
        }
    }

    let details = reply.video_details.unwrap_or_default();
    let streaming = reply.streaming_data.unwrap_or_default();

    let mut formats: Vec<Variant> = streaming
        .formats
        .into_iter()
        .chain(streaming.adaptive_formats)
        .map(normalize_format)
        .collect();
    // Stable, so equal (height, bitrate) keep upstream order.
    formats.sort_by(|a, b| {
        let key = |v: &Variant| (v.height_px.unwrap_or(0), v.bitrate.unwrap_or(0));
        key(b).cmp(&key(a))
    });

    let thumbnail = details
        .thumbnail
        .and_then(|t| t.thumbnails.into_iter().max_by_key(|t| t.width.unwrap_or(0)))
        .map(|t| t.url);

    Ok(VideoInfo {
        id: details.video_id.unwrap_or_else(|| id.to_string()),
        title: details.title.unwrap_or_else(|| "YouTube Video".to_string()),
        duration_secs: details.length_seconds.and_then(|s| s.parse().ok()),
        thumbnail,
        channel: details.author,
        formats,
    })
}

fn normalize_format(raw: ApiFormat) -> Variant {
    let mime = raw.mime_type.unwrap_or_default();
    let has_video = mime.starts_with("video/");
    let has_audio = mime.starts_with("audio/") || raw.audio_quality.is_some();

    Variant {
        protocol: Protocol::Progressive,
        source_url: raw.url,
        container: container_from_mime(&mime),
        has_audio,
        has_video,
        quality_label: raw.quality_label.or(raw.audio_quality),
        height_px: raw.height,
        bitrate: raw.bitrate,
        format_id: raw.itag.map(|i| i.to_string()),
    }
}

// ============================================================================
// Player API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    video_details: Option<VideoDetails>,
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    video_id: Option<String>,
    title: Option<String>,
    length_seconds: Option<String>,
    author: Option<String>,
    thumbnail: Option<ThumbnailList>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailList {
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
    width: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<ApiFormat>,
    #[serde(default)]
    adaptive_formats: Vec<ApiFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFormat {
    itag: Option<u32>,
    url: Option<String>,
    mime_type: Option<String>,
    bitrate: Option<u64>,
    height: Option<u32>,
    quality_label: Option<String>,
    audio_quality: Option<String>,
}

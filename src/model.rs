//! Normalized media types shared by every platform.
//!
//! Upstream payloads are mapped into these shapes once, at the edge; nothing
//! downstream ever touches raw platform JSON.

use serde::Serialize;

/// Delivery protocol of a single encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Single-file download.
    Progressive,
    /// Segmented playlist.
    Hls,
    Other,
}

impl Protocol {
    pub fn from_upstream(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "progressive" => Self::Progressive,
            "hls" => Self::Hls,
            _ => Self::Other,
        }
    }
}

/// One available encoding of a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub protocol: Protocol,
    /// Where the encoding (or its URL exchange) lives. `None` when the
    /// platform withholds it, e.g. ciphered YouTube formats.
    pub source_url: Option<String>,
    pub container: Option<String>,
    pub has_audio: bool,
    pub has_video: bool,
    pub quality_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_px: Option<u32>,
    /// Bits per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    /// Upstream identifier (YouTube itag, SoundCloud preset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
}

impl Variant {
    /// A variant is usable only if it exposes a non-empty source URL.
    pub fn is_usable(&self) -> bool {
        self.source_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// Uploader of a track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Owner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "fullName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Metadata for a single track, fresh per resolve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetadata {
    pub id: String,
    pub title: String,
    #[serde(rename = "permalinkUrl", skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(rename = "user")]
    pub owner: Owner,
    /// Upstream order, treated as quality-descending.
    pub variants: Vec<Variant>,
}

impl TrackMetadata {
    pub fn summary(&self) -> TrackSummary {
        TrackSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            canonical_url: self.canonical_url.clone(),
            duration_ms: self.duration_ms,
            artwork_url: self.artwork_url.clone(),
            owner: self.owner.clone(),
        }
    }
}

/// [`TrackMetadata`] without the variant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "permalinkUrl", skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(rename = "user")]
    pub owner: Owner,
}

/// A signed, short-lived direct URL. Never cached: the platform signs it
/// per request and controls its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStream {
    #[serde(rename = "url")]
    pub direct_url: String,
    pub track: TrackSummary,
}

/// Video details plus every format the platform offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub duration_secs: Option<u64>,
    pub thumbnail: Option<String>,
    pub channel: Option<String>,
    /// Sorted quality-descending.
    pub formats: Vec<Variant>,
}

/// Map a MIME type like `audio/mp4; codecs="mp4a.40.2"` to a container name.
pub fn container_from_mime(mime: &str) -> Option<String> {
    let essence = mime.split(';').next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;
    let container = match (kind, subtype) {
        ("audio", "mpeg") => "mp3",
        ("audio", "mp4") => "m4a",
        (_, "x-mpegurl" | "vnd.apple.mpegurl") => "m3u8",
        (_, other) if !other.is_empty() => other,
        _ => return None,
    };
    Some(container.to_string())
}

//! Metadata resolution against SoundCloud's internal `api-v2`.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::attach_client_id;
use crate::credential::{with_credential, CredentialCache};
use crate::error::{ResolveError, Result};
use crate::http_client::HttpClient;
use crate::model::{container_from_mime, Owner, Protocol, TrackMetadata, Variant};
use crate::retry::RetryPolicy;

/// Upper bound the API accepts for a single search page.
const MAX_PAGE_SIZE: usize = 50;

const DEFAULT_TITLE: &str = "SoundCloud Track";

/// Resolves track URLs and search queries into [`TrackMetadata`].
pub struct MetadataResolver {
    http: HttpClient,
    api_base: String,
    credentials: CredentialCache,
    retry: RetryPolicy,
}

impl MetadataResolver {
    pub fn new(http: HttpClient, api_base: impl Into<String>, credentials: CredentialCache) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            credentials,
            retry: RetryPolicy::NONE,
        }
    }

    /// Retry network errors and 5xx replies according to `retry`.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}/{path}", self.api_base.trim_end_matches('/'));
        Url::parse_with_params(&raw, params)
            .map_err(|e| ResolveError::upstream(None, format!("invalid api base: {e}")))
    }

    /// GET a credentialed API URL, refreshing the credential once on 401/403.
    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &Url) -> Result<T> {
        self.retry
            .run(move || {
                with_credential(&self.credentials, move |credential| async move {
                    let url = attach_client_id(url, &credential.value);
                    self.http.get_json(url.as_str()).await
                })
            })
            .await
    }

    /// Resolve a public track URL.
    #[instrument(skip(self))]
    pub async fn resolve_by_url(&self, url: &str) -> Result<TrackMetadata> {
        let endpoint = self.endpoint("resolve", &[("url", url)])?;
        let raw: Option<ApiTrack> = self.fetch_json(&endpoint).await?;

        let Some(raw) = raw.filter(|r| !r.is_empty()) else {
            debug!("Resolve returned no resource");
            return Err(ResolveError::NotFound);
        };
        if !raw.is_track() {
            debug!(kind = ?raw.kind, "Resolved resource is not a track");
            return Err(ResolveError::NotFound);
        }
        normalize_track(raw)
    }

    /// Search tracks. Pages are requested only as the stream is polled, and
    /// the stream ends after `limit` tracks or when the upstream runs dry.
    /// Calling again issues a fresh query.
    pub fn search<'a>(&'a self, query: &str, limit: usize) -> BoxStream<'a, Result<TrackMetadata>> {
        if query.trim().is_empty() || limit == 0 {
            return stream::empty().boxed();
        }

        let page_size = limit.min(MAX_PAGE_SIZE).to_string();
        let first = self.endpoint(
            "search/tracks",
            &[("q", query), ("limit", &page_size), ("offset", "0")],
        );

        let pages = stream::try_unfold(Some(first), move |next| async move {
            let Some(url) = next else {
                return Ok::<_, ResolveError>(None);
            };
            let page: SearchPage = self.fetch_json(&url?).await?;
            debug!(items = page.collection.len(), "Search page received");

            let next = match page.next_href {
                Some(href) if !page.collection.is_empty() => {
                    Some(Url::parse(&href).map_err(|e| {
                        ResolveError::upstream(None, format!("bad next_href: {e}"))
                    }))
                }
                _ => None,
            };

            let tracks: Vec<Result<TrackMetadata>> = page
                .collection
                .into_iter()
                .filter(ApiTrack::is_track)
                .filter_map(|raw| match normalize_track(raw) {
                    Ok(track) => Some(Ok(track)),
                    Err(e) => {
                        warn!("Skipping malformed search result: {e}");
                        None
                    }
                })
                .collect();

            Ok(Some((stream::iter(tracks), next)))
        });

        pages.try_flatten().take(limit).boxed()
    }
}

/// Map an upstream track into the normalized shape. Only `id` is required.
fn normalize_track(raw: ApiTrack) -> Result<TrackMetadata> {
    let id = match raw.id {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        _ => return Err(ResolveError::upstream(None, "track without id")),
    };

    let authorization = raw.track_authorization;
    let variants = raw
        .media
        .map(|m| m.transcodings)
        .unwrap_or_default()
        .into_iter()
        .map(|t| normalize_transcoding(t, authorization.as_deref()))
        .collect();

    let user = raw.user.unwrap_or_default();

    Ok(TrackMetadata {
        id,
        title: raw
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        canonical_url: raw.permalink_url,
        duration_ms: raw.duration.or(raw.full_duration),
        artwork_url: raw.artwork_url,
        owner: Owner {
            username: user.username,
            display_name: user.full_name,
        },
        variants,
    })
}

fn normalize_transcoding(raw: ApiTranscoding, authorization: Option<&str>) -> Variant {
    let format = raw.format.unwrap_or_default();

    let source_url = raw.url.map(|url| match (authorization, Url::parse(&url)) {
        (Some(auth), Ok(mut parsed)) => {
            parsed
                .query_pairs_mut()
                .append_pair("track_authorization", auth);
            parsed.to_string()
        }
        _ => url,
    });

    Variant {
        protocol: format
            .protocol
            .as_deref()
            .map_or(Protocol::Other, Protocol::from_upstream),
        source_url,
        container: format.mime_type.as_deref().and_then(container_from_mime),
        has_audio: true,
        has_video: false,
        quality_label: raw.quality,
        height_px: None,
        bitrate: None,
        format_id: raw.preset,
    }
}

// ============================================================================
// api-v2 response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiTrack {
    kind: Option<String>,
    id: Option<serde_json::Value>,
    title: Option<String>,
    permalink_url: Option<String>,
    duration: Option<u64>,
    full_duration: Option<u64>,
    artwork_url: Option<String>,
    user: Option<ApiUser>,
    media: Option<ApiMedia>,
    track_authorization: Option<String>,
}

impl ApiTrack {
    /// Search results and resolve replies may carry playlists and users too.
    fn is_track(&self) -> bool {
        self.kind.as_deref().map_or(true, |k| k == "track")
    }

    /// `null` and `{}` both mean nothing lives at the resolved URL.
    fn is_empty(&self) -> bool {
        self.kind.is_none() && self.id.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiUser {
    username: Option<String>,
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMedia {
    #[serde(default)]
    transcodings: Vec<ApiTranscoding>,
}

#[derive(Debug, Deserialize)]
struct ApiTranscoding {
    url: Option<String>,
    preset: Option<String>,
    quality: Option<String>,
    format: Option<ApiFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiFormat {
    protocol: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    collection: Vec<ApiTrack>,
    next_href: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> ApiTrack {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalizes_full_track() {
        let raw = parse(json!({
            "kind": "track",
            "id": 123456,
            "title": "Night Drive",
            "permalink_url": "https://soundcloud.com/artist/night-drive",
            "duration": 215000,
            "artwork_url": "https://i1.sndcdn.com/artworks-abc-large.jpg",
            "track_authorization": "auth-token",
            "user": { "username": "artist", "full_name": "The Artist" },
            "media": { "transcodings": [
                {
                    "url": "https://api-v2.soundcloud.com/media/soundcloud:tracks:123456/a/stream/hls",
                    "preset": "mp3_1_0",
                    "quality": "sq",
                    "format": { "protocol": "hls", "mime_type": "audio/mpeg" }
                },
                {
                    "url": "https://api-v2.soundcloud.com/media/soundcloud:tracks:123456/b/stream/progressive",
                    "preset": "mp3_1_0",
                    "quality": "sq",
                    "format": { "protocol": "progressive", "mime_type": "audio/mpeg" }
                }
            ]}
        }));

        let track = normalize_track(raw).unwrap();
        assert_eq!(track.id, "123456");
        assert_eq!(track.title, "Night Drive");
        assert_eq!(track.duration_ms, Some(215_000));
        assert_eq!(track.owner.username.as_deref(), Some("artist"));
        assert_eq!(track.owner.display_name.as_deref(), Some("The Artist"));
        assert_eq!(track.variants.len(), 2);

        let progressive = &track.variants[1];
        assert_eq!(progressive.protocol, Protocol::Progressive);
        assert_eq!(progressive.container.as_deref(), Some("mp3"));
        assert!(progressive
            .source_url
            .as_deref()
            .unwrap()
            .ends_with("/stream/progressive?track_authorization=auth-token"));
    }

    #[test]
    fn missing_optionals_are_absent_not_errors() {
        let raw = parse(json!({ "id": 7, "user": null, "media": null }));
        let track = normalize_track(raw).unwrap();
        assert_eq!(track.title, DEFAULT_TITLE);
        assert_eq!(track.canonical_url, None);
        assert_eq!(track.owner, Owner::default());
        assert!(track.variants.is_empty());
    }

    #[test]
    fn missing_id_is_malformed() {
        let raw = parse(json!({ "title": "no id" }));
        assert!(matches!(
            normalize_track(raw),
            Err(ResolveError::Upstream { .. })
        ));
    }

    #[test]
    fn unknown_protocol_maps_to_other() {
        let raw: ApiTranscoding = serde_json::from_value(json!({
            "url": "https://x/stream",
            "format": { "protocol": "ctr-encrypted-hls", "mime_type": "audio/mp4; codecs=\"mp4a.40.2\"" }
        }))
        .unwrap();
        let variant = normalize_transcoding(raw, None);
        assert_eq!(variant.protocol, Protocol::Other);
        assert_eq!(variant.container.as_deref(), Some("m4a"));
        assert_eq!(variant.source_url.as_deref(), Some("https://x/stream"));
    }

    #[test]
    fn non_track_kinds_are_filtered() {
        assert!(!parse(json!({ "kind": "playlist", "id": 1 })).is_track());
        assert!(parse(json!({ "kind": "track", "id": 1 })).is_track());
        assert!(parse(json!({ "id": 1 })).is_track());
    }

    #[test]
    fn bare_object_is_empty() {
        assert!(parse(json!({})).is_empty());
        assert!(parse(json!({ "title": "orphan" })).is_empty());
        assert!(!parse(json!({ "id": 1 })).is_empty());
        assert!(!parse(json!({ "kind": "user" })).is_empty());
    }
}

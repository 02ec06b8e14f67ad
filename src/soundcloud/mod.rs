//! SoundCloud: URL → metadata → playable stream.
//!
//! ```text
//! resolve(url) ──► select(Progressive) ──► fetch stream URL
//!       │                                        │
//!       └──── client_id from CredentialCache ────┘
//! ```
//!
//! Every credentialed call goes through [`with_credential`], so an expired
//! `client_id` costs one extra round trip and one scrape, never an error.

pub mod api;
pub mod stream_url;

use std::sync::Arc;

use futures::stream::{BoxStream, TryStreamExt};
use tracing::instrument;
use url::Url;

use crate::clock::Clock;
use crate::config::SoundCloudConfig;
use crate::credential::{with_credential, CredentialCache, CredentialScraper};
use crate::error::{ResolveError, Result};
use crate::http_client::HttpClient;
use crate::model::{ResolvedStream, TrackMetadata};
use crate::retry::RetryPolicy;
use crate::select::{select, Preference};

pub use api::MetadataResolver;
pub use stream_url::StreamUrlFetcher;

/// Hosts whose URLs the resolve endpoint understands.
const TRACK_HOSTS: &[&str] = &[
    "soundcloud.com",
    "www.soundcloud.com",
    "m.soundcloud.com",
    "on.soundcloud.com",
    "snd.sc",
];

/// The SoundCloud pipeline.
pub struct SoundCloud {
    credentials: CredentialCache,
    resolver: MetadataResolver,
    fetcher: StreamUrlFetcher,
    retry: RetryPolicy,
}

impl SoundCloud {
    /// Pipeline backed by a scraping credential source.
    pub fn new(http: HttpClient, config: &SoundCloudConfig, clock: Arc<dyn Clock>) -> Self {
        let scraper = CredentialScraper::new(http.clone(), config, Arc::clone(&clock));
        let credentials = CredentialCache::new(Arc::new(scraper), clock);
        Self::with_credentials(http, config, credentials)
    }

    /// Pipeline sharing an existing credential cache.
    pub fn with_credentials(
        http: HttpClient,
        config: &SoundCloudConfig,
        credentials: CredentialCache,
    ) -> Self {
        let retry = RetryPolicy::from_config(config);
        let resolver = MetadataResolver::new(http.clone(), config.api_base.clone(), credentials.clone())
            .with_retry(retry);
        Self {
            credentials,
            resolver,
            fetcher: StreamUrlFetcher::new(http),
            retry,
        }
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    /// Track metadata for a public track URL.
    #[instrument(skip(self))]
    pub async fn resolve(&self, url: &str) -> Result<TrackMetadata> {
        let url = validate_track_url(url)?;
        self.resolver.resolve_by_url(url.as_str()).await
    }

    /// Up to `limit` tracks matching `query`, fetched page by page on demand.
    pub fn search_stream<'a>(
        &'a self,
        query: &str,
        limit: usize,
    ) -> BoxStream<'a, Result<TrackMetadata>> {
        self.resolver.search(query, limit)
    }

    /// Collect [`Self::search_stream`]. An empty result is not an error.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackMetadata>> {
        if query.trim().is_empty() {
            return Err(ResolveError::Validation("Empty search query".into()));
        }
        self.search_stream(query, limit).try_collect().await
    }

    /// Resolve, pick the progressive variant and exchange it for a playable URL.
    #[instrument(skip(self))]
    pub async fn stream(&self, url: &str) -> Result<ResolvedStream> {
        let track = self.resolve(url).await?;
        let variant = select(&track.variants, Preference::Progressive)?;
        let track = &track;

        self.retry
            .run(move || {
                with_credential(&self.credentials, move |credential| async move {
                    self.fetcher.fetch(variant, &credential, track).await
                })
            })
            .await
    }
}

/// Parse `raw` and check that it points at a SoundCloud page.
pub fn validate_track_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ResolveError::Validation(format!("Invalid URL: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ResolveError::Validation(format!("Unsupported scheme: {}", url.scheme())));
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if !TRACK_HOSTS.contains(&host.as_str()) {
        return Err(ResolveError::Validation(format!("Not a SoundCloud URL: {raw}")));
    }
    Ok(url)
}

/// Copy of `url` carrying exactly one `client_id` query parameter.
pub(crate) fn attach_client_id(url: &Url, client_id: &str) -> Url {
    let mut out = url.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "client_id")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    out.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("client_id", client_id);
    out
}

//! Exchange a transcoding URL for a short-lived playable URL.

use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::attach_client_id;
use crate::credential::Credential;
use crate::error::{ResolveError, Result};
use crate::http_client::HttpClient;
use crate::model::{ResolvedStream, TrackMetadata, Variant};

#[derive(Debug, Deserialize)]
struct StreamLocation {
    url: Option<String>,
}

/// One GET per call, no retries of its own.
#[derive(Clone)]
pub struct StreamUrlFetcher {
    http: HttpClient,
}

impl StreamUrlFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    #[instrument(skip_all, fields(track = %track.id, protocol = ?variant.protocol))]
    pub async fn fetch(
        &self,
        variant: &Variant,
        credential: &Credential,
        track: &TrackMetadata,
    ) -> Result<ResolvedStream> {
        let source = variant.source_url.as_deref().ok_or(ResolveError::NoVariant)?;
        let source = Url::parse(source)
            .map_err(|e| ResolveError::upstream(None, format!("bad transcoding url: {e}")))?;

        let url = attach_client_id(&source, &credential.value);
        let location: StreamLocation = self.http.get_json(url.as_str()).await?;

        let direct_url = location
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ResolveError::upstream(None, "stream reply without url"))?;
        debug!("Stream URL issued");

        Ok(ResolvedStream {
            direct_url,
            track: track.summary(),
        })
    }
}

//! Shared outbound HTTP client
//!
//! One `reqwest::Client` per process so every scrape, resolve and stream
//! exchange reuses the same connection pool. Response statuses are mapped
//! into the [`ResolveError`] taxonomy here, once, so callers only ever match
//! on typed errors.

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::HttpConfig;
use crate::error::{ResolveError, Result};

/// Desktop browser user agents. The landing page serves a stripped-down
/// document to unknown clients.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Thin wrapper around `reqwest::Client` with status classification.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let user_agent = config.user_agent.clone().unwrap_or_else(|| {
            USER_AGENTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(USER_AGENTS[0])
                .to_string()
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            // ═══════════════════════════════════════════════════════════════
            // CONNECTION REUSE
            // ═══════════════════════════════════════════════════════════════
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            // ═══════════════════════════════════════════════════════════════
            // IDENTITY
            // ═══════════════════════════════════════════════════════════════
            .user_agent(user_agent)
            .default_headers(headers)
            .cookie_store(true)
            // ═══════════════════════════════════════════════════════════════
            // TIMEOUTS
            // ═══════════════════════════════════════════════════════════════
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// GET `url`, failing with a typed error on any non-2xx status.
    #[instrument(skip(self), fields(url = %redact(url)))]
    pub async fn get(&self, url: &str) -> Result<Response> {
        debug!("GET");
        let response = self.client.get(url).send().await?;
        debug!(status = %response.status(), "Response received");
        check_status(response).await
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// POST a JSON body and decode a JSON reply.
    #[instrument(skip(self, body), fields(url = %redact(url)))]
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST");
        let response = self.client.post(url).json(body).send().await?;
        debug!(status = %response.status(), "Response received");
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Map an upstream status onto the error taxonomy.
pub fn classify_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ResolveError::UpstreamAuth,
        StatusCode::NOT_FOUND => ResolveError::NotFound,
        other => ResolveError::upstream(
            Some(other.as_u16()),
            other.canonical_reason().unwrap_or("unexpected status"),
        ),
    })
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if let Err(err) = classify_status(status) {
        if let ResolveError::Upstream { status, .. } = &err {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            if !snippet.is_empty() {
                return Err(ResolveError::upstream(*status, snippet));
            }
        }
        return Err(err);
    }
    Ok(response)
}

/// Strip credential-bearing query parameters before a URL reaches the logs.
pub(crate) fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    let v = if k == "client_id" { "***".into() } else { v.into_owned() };
                    (k.into_owned(), v)
                })
                .collect();
            if pairs.is_empty() {
                return parsed.to_string();
            }
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

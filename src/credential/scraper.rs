//! `client_id` scraping from the SoundCloud web player.
//!
//! The landing page references a handful of script bundles on the asset CDN;
//! one of the last ones carries `client_id:"<32 alphanumerics>"`. The two
//! parsing steps are plain functions over text so they can be tested against
//! fixtures.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use super::{Credential, CredentialSource};
use crate::clock::Clock;
use crate::config::SoundCloudConfig;
use crate::error::{ResolveError, Result};
use crate::http_client::HttpClient;

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[src]").expect("static selector"));

static CLIENT_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"client_id"?\s*[:=]\s*"?([A-Za-z0-9]{32})\b"#).expect("static regex")
});

/// Script URLs on `cdn_host`, in document order. Relative `src` values are
/// resolved against `base`.
pub fn extract_script_urls(html: &str, base: &Url, cdn_host: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut urls = Vec::new();

    for element in document.select(&SCRIPT_SELECTOR) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let Ok(resolved) = base.join(src.trim()) else {
            continue;
        };
        if resolved.host_str() == Some(cdn_host) && !urls.contains(&resolved.to_string()) {
            urls.push(resolved.to_string());
        }
    }

    urls
}

/// First `client_id` token in a script body.
pub fn find_client_id(script: &str) -> Option<&str> {
    CLIENT_ID_RE
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Scrapes a fresh credential from public web assets.
pub struct CredentialScraper {
    http: HttpClient,
    landing_url: String,
    cdn_host: String,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl CredentialScraper {
    pub fn new(http: HttpClient, config: &SoundCloudConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = i64::try_from(config.credential_ttl_secs)
            .map(chrono::Duration::seconds)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        Self {
            http,
            landing_url: config.landing_url.clone(),
            cdn_host: config.cdn_host.clone(),
            clock,
            ttl,
        }
    }

    async fn scrape_token(&self) -> Result<String> {
        let base = Url::parse(&self.landing_url)
            .map_err(|e| acquisition(format!("invalid landing url: {e}")))?;

        let html = self
            .http
            .get_text(base.as_str())
            .await
            .map_err(|e| acquisition(format!("landing page: {e}")))?;

        let scripts = extract_script_urls(&html, &base, &self.cdn_host);
        debug!(count = scripts.len(), "Found candidate scripts");
        if scripts.is_empty() {
            return Err(acquisition(format!("no scripts from {}", self.cdn_host)));
        }

        let mut failures = 0usize;
        for script_url in scripts.iter().rev() {
            match self.http.get_text(script_url).await {
                Ok(body) => {
                    if let Some(token) = find_client_id(&body) {
                        debug!(script = %script_url, "Token found");
                        return Ok(token.to_string());
                    }
                }
                Err(e) => {
                    failures += 1;
                    debug!(script = %script_url, "Script fetch failed: {e}");
                }
            }
        }

        if failures == scripts.len() {
            return Err(acquisition("every script fetch failed"));
        }
        Err(acquisition(format!(
            "no client_id in {} scripts",
            scripts.len()
        )))
    }
}

#[async_trait]
impl CredentialSource for CredentialScraper {
    #[instrument(skip(self), fields(landing = %self.landing_url))]
    async fn acquire(&self) -> Result<Credential> {
        let value = self.scrape_token().await?;
        let acquired_at = self.clock.now();
        info!("Scraped new client_id");
        Ok(Credential {
            value,
            acquired_at,
            expires_at: acquired_at + self.ttl,
        })
    }
}

fn acquisition(reason: impl Into<String>) -> ResolveError {
    ResolveError::CredentialAcquisition(reason.into())
}

//! Ephemeral platform credentials.
//!
//! The SoundCloud internal API only accepts requests carrying a `client_id`
//! that the web player embeds in its script bundles. This module scrapes
//! that token ([`scraper`]), keeps one live copy around ([`cache`]) and
//! implements the one-shot retry on authorization failure that every
//! credentialed call shares ([`with_credential`]).

pub mod cache;
pub mod scraper;

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::{ResolveError, Result};

pub use cache::{CacheStats, CredentialCache};
pub use scraper::CredentialScraper;

/// A scraped access token and its validity window. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub value: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Anything that can mint a fresh [`Credential`].
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn acquire(&self) -> Result<Credential>;
}

/// Run `op` with the cached credential, retrying exactly once with a fresh
/// credential if the upstream rejects the first one.
///
/// A second rejection is returned as [`ResolveError::UpstreamAuth`]; every
/// other outcome passes through untouched.
pub async fn with_credential<T, F, Fut>(cache: &CredentialCache, mut op: F) -> Result<T>
where
    F: FnMut(Credential) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let credential = cache.get().await?;
    match op(credential.clone()).await {
        Err(ResolveError::UpstreamAuth) => {
            warn!("Upstream rejected credential, refreshing once");
            cache.invalidate_if(&credential);
            let fresh = cache.get().await?;
            op(fresh).await
        }
        other => other,
    }
}

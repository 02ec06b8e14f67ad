//! TTL-bounded credential cache with single-flight refresh.
//!
//! At most one scrape runs at a time. Callers that find the cache empty all
//! await the same shared refresh. The refresh itself runs as a spawned task,
//! so a waiter that times out or is dropped never cancels it for the others,
//! and its result lands in the cache even if nobody is left waiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{Credential, CredentialSource};
use crate::clock::Clock;
use crate::error::{ResolveError, Result};

type PendingRefresh = Shared<BoxFuture<'static, Result<Credential>>>;

#[derive(Default)]
struct Slot {
    current: Option<Credential>,
    refresh: Option<PendingRefresh>,
}

struct Inner {
    source: Arc<dyn CredentialSource>,
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot>,
    refreshes: AtomicU64,
    invalidations: AtomicU64,
}

/// Counters for observing cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Scrapes started.
    pub refreshes: u64,
    /// Explicit invalidations after auth failures.
    pub invalidations: u64,
}

/// Holds at most one live [`Credential`]. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CredentialCache {
    inner: Arc<Inner>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn CredentialSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                clock,
                slot: Mutex::new(Slot::default()),
                refreshes: AtomicU64::new(0),
                invalidations: AtomicU64::new(0),
            }),
        }
    }

    /// Return the cached credential, refreshing it first if it is missing or
    /// expired. A failed refresh is reported to every waiter and leaves the
    /// cache empty so the next call can try again.
    pub async fn get(&self) -> Result<Credential> {
        let pending = {
            let mut slot = self.inner.slot.lock();
            if let Some(credential) = &slot.current {
                if credential.is_valid_at(self.inner.clock.now()) {
                    return Ok(credential.clone());
                }
                debug!(expired_at = %credential.expires_at, "Cached credential expired");
                slot.current = None;
            }

            if let Some(pending) = &slot.refresh {
                debug!("Joining in-flight credential refresh");
                pending.clone()
            } else {
                let pending = self.spawn_refresh();
                slot.refresh = Some(pending.clone());
                pending
            }
        };

        pending.await
    }

    /// Drop the cached credential immediately, whatever its expiry. The next
    /// [`get`](Self::get) scrapes again.
    pub fn invalidate(&self) {
        self.inner.invalidations.fetch_add(1, Ordering::Relaxed);
        if self.inner.slot.lock().current.take().is_some() {
            info!("Credential invalidated");
        }
    }

    /// Drop the cached credential only if it is still `rejected`.
    ///
    /// A caller holding a stale credential must not evict the replacement
    /// another caller already fetched. Returns whether anything was dropped.
    pub fn invalidate_if(&self, rejected: &Credential) -> bool {
        let mut slot = self.inner.slot.lock();
        if slot.current.as_ref() != Some(rejected) {
            debug!("Rejected credential already replaced");
            return false;
        }
        slot.current = None;
        self.inner.invalidations.fetch_add(1, Ordering::Relaxed);
        info!("Credential invalidated");
        true
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            refreshes: self.inner.refreshes.load(Ordering::Relaxed),
            invalidations: self.inner.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Must be called with the slot lock held so only one refresh is ever
    /// registered.
    fn spawn_refresh(&self) -> PendingRefresh {
        self.inner.refreshes.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let mut guard = ClearRefresh(Some(Arc::clone(&inner)));
            info!("Refreshing credential");
            let result = inner.source.acquire().await;
            {
                let mut slot = inner.slot.lock();
                slot.refresh = None;
                match &result {
                    Ok(credential) => {
                        info!(expires_at = %credential.expires_at, "Credential refreshed");
                        slot.current = Some(credential.clone());
                    }
                    Err(e) => warn!("Credential refresh failed: {e}"),
                }
            }
            guard.0 = None;
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(ResolveError::CredentialAcquisition(format!(
                    "refresh task aborted: {e}"
                )))
            })
        }
        .boxed()
        .shared()
    }
}

/// Clears the in-flight refresh if the refresh task unwinds before it
/// finishes. Disarmed by taking the `Arc` out.
struct ClearRefresh(Option<Arc<Inner>>);

impl Drop for ClearRefresh {
    fn drop(&mut self) {
        if let Some(inner) = self.0.take() {
            warn!("Credential refresh aborted");
            inner.slot.lock().refresh = None;
        }
    }
}

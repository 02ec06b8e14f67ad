//! `medialink` - resolve public media URLs into playable streams
//!
//! # Features
//!
//! - **SoundCloud**: track search, metadata resolution and signed stream URLs,
//!   backed by a scraped `client_id` that is cached, shared and refreshed
//!   transparently
//! - **YouTube**: format listing and quality-bounded selection via the player
//!   endpoint
//! - **Gateway**: the same operations as a small JSON HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use medialink::{Config, HttpClient, SoundCloud, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let http = HttpClient::new(&config.http)?;
//!     let soundcloud = SoundCloud::new(http, &config.soundcloud, Arc::new(SystemClock));
//!
//!     let stream = soundcloud.stream("https://soundcloud.com/artist/track").await?;
//!     println!("{}", stream.direct_url);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod http_client;
pub mod model;
pub mod retry;
pub mod select;
pub mod server;
pub mod soundcloud;
pub mod youtube;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use credential::{Credential, CredentialCache, CredentialScraper, CredentialSource};
pub use error::{ResolveError, Result};
pub use http_client::HttpClient;
pub use model::{Owner, Protocol, ResolvedStream, TrackMetadata, TrackSummary, Variant, VideoInfo};
pub use retry::RetryPolicy;
pub use select::{select, Preference, StreamQuality};
pub use soundcloud::SoundCloud;
pub use youtube::YouTube;

/// Version of medialink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

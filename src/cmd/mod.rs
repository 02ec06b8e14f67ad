pub mod output;
pub mod serve;
pub mod soundcloud;
pub mod youtube;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use medialink::server::AppState;
use medialink::{Config, HttpClient, SoundCloud, SystemClock, YouTube};

/// Everything a subcommand needs, built once from the loaded config.
pub struct Context {
    pub config: Config,
    pub json: bool,
    pub soundcloud: Arc<SoundCloud>,
    pub youtube: Arc<YouTube>,
}

impl Context {
    pub fn new(config: Config, json: bool) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        let soundcloud = SoundCloud::new(http.clone(), &config.soundcloud, Arc::new(SystemClock));
        let youtube = YouTube::new(http, config.youtube.clone());

        Ok(Self {
            config,
            json,
            soundcloud: Arc::new(soundcloud),
            youtube: Arc::new(youtube),
        })
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            soundcloud: Arc::clone(&self.soundcloud),
            youtube: Arc::clone(&self.youtube),
            request_timeout: Duration::from_secs(self.config.server.request_timeout_secs),
        }
    }
}

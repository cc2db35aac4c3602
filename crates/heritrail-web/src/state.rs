//! Shared application state for the web server.

use std::sync::Arc;

use heritrail_backend::BackendClient;
use heritrail_config::Config;
use heritrail_media::MediaService;
use heritrail_resolver::Resolver;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub resolver: Resolver,
    pub backend: BackendClient,
    pub media: MediaService,
}

impl AppState {
    pub fn new(config: Config, resolver: Resolver, backend: BackendClient, media: MediaService) -> Self {
        Self { config, resolver, backend, media }
    }

    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let resolver = Resolver::from_config(&config)?;
        let backend = BackendClient::new(&config.backend)?;
        let media = MediaService::new(
            &config.media,
            &config.resolver.user_agent,
            config.resolver.allow_private_hosts,
        )?;
        Ok(Self::new(config, resolver, backend, media))
    }
}

pub type SharedState = Arc<AppState>;

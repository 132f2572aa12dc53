//! Wiring of the external collaborators both drivers share.

use crate::client::{AppleMusicClient, FallbackToken, WebPlayerToken};
use crate::config::Config;
use crate::core::artist::ArtistExpander;
use crate::core::catalog::{CatalogApi, TokenSource};
use crate::core::dispatch::{DispatchRouter, DispatchSettings, MediaDownloader, PathLocator, ToolLocator};
use crate::core::downloader::ProcessDownloader;
use crate::error::CatalogError;
use std::sync::Arc;

#[derive(Clone)]
pub struct Services {
    pub tokens: Arc<dyn TokenSource>,
    pub catalog: Arc<dyn CatalogApi>,
    pub downloader: Arc<dyn MediaDownloader>,
    pub tools: Arc<dyn ToolLocator>,
}

impl Services {
    /// Live collaborators: web player token scrape, catalog API, external pipeline.
    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        let http = AppleMusicClient::http_client()?;
        Ok(Self {
            tokens: Arc::new(FallbackToken::new(
                WebPlayerToken::new(http.clone()),
                config.fallback_token(),
            )),
            catalog: Arc::new(AppleMusicClient::new(http)),
            downloader: Arc::new(ProcessDownloader::new(config.downloader_command.clone())),
            tools: Arc::new(PathLocator),
        })
    }

    /// Router for one run. `artist_folder` is the artist template, filled in
    /// when the queue came from an artist URL.
    pub fn router(&self, config: &Config, artist_folder: &str) -> DispatchRouter {
        DispatchRouter::new(
            self.downloader.clone(),
            self.tools.clone(),
            DispatchSettings {
                media_user_token: config.media_user_token.clone(),
                decrypt_tool: config.decrypt_tool.clone(),
                save_folder: config.alac_save_folder.clone(),
                artist_folder: artist_folder.to_string(),
            },
        )
    }

    pub fn expander(&self, config: &Config) -> ArtistExpander {
        ArtistExpander::new(self.catalog.clone(), config.artist_folder_format.clone(), config.limit_max)
    }
}

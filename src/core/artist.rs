use crate::core::catalog::CatalogApi;
use crate::core::descriptor::{classify, MediaType};
use crate::error::ExpandError;
use crate::utils::apply_artist_folder;
use std::sync::Arc;
use tracing::{info, warn};

/// An artist URL turned into a download queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistExpansion {
    pub artist_id: String,
    pub artist_name: String,
    /// Artist folder template with the artist placeholders filled in.
    pub folder_format: String,
    /// Album URLs followed by music video URLs, in catalog order.
    pub urls: Vec<String>,
    pub album_count: usize,
}

pub struct ArtistExpander {
    catalog: Arc<dyn CatalogApi>,
    folder_template: String,
    limit_max: usize,
}

impl ArtistExpander {
    pub fn new(catalog: Arc<dyn CatalogApi>, folder_template: impl Into<String>, limit_max: usize) -> Self {
        Self {
            catalog,
            folder_template: folder_template.into(),
            limit_max,
        }
    }

    pub async fn expand(&self, url: &str, token: &str) -> Result<ArtistExpansion, ExpandError> {
        let descriptor = classify(url);
        if descriptor.media_type != MediaType::Artist {
            return Err(ExpandError::InvalidUrl(url.to_string()));
        }
        let storefront = descriptor.storefront.as_str();
        let id = descriptor.catalog_id.as_str();

        let profile = self
            .catalog
            .artist(storefront, id, token)
            .await
            .map_err(ExpandError::ArtistName)?;
        let folder_format = apply_artist_folder(&self.folder_template, &profile.name, &profile.id, self.limit_max);

        let (albums, videos) = futures::join!(
            self.catalog.artist_albums(storefront, id, token),
            self.catalog.artist_music_videos(storefront, id, token),
        );
        let albums = albums.map_err(ExpandError::Albums)?;
        let videos = videos.unwrap_or_else(|e| {
            warn!(artist = %profile.name, error = %e, "Failed to get artist music-videos");
            Vec::new()
        });

        info!(
            artist = %profile.name,
            albums = albums.len(),
            music_videos = videos.len(),
            "expanded artist"
        );

        let album_count = albums.len();
        let urls = albums
            .into_iter()
            .chain(videos)
            .map(|entry| entry.url)
            .collect();

        Ok(ArtistExpansion {
            artist_id: profile.id,
            artist_name: profile.name,
            folder_format,
            urls,
            album_count,
        })
    }
}

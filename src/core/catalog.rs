use crate::core::metadata::{ArtistProfile, CatalogEntry, SearchHit, SearchKind};
use crate::error::CatalogError;
use async_trait::async_trait;

/// Issues the bearer token every catalog request needs.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, CatalogError>;
}

/// Read-only lookups against the catalog service.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn artist(&self, storefront: &str, id: &str, token: &str) -> Result<ArtistProfile, CatalogError>;

    async fn artist_albums(&self, storefront: &str, id: &str, token: &str) -> Result<Vec<CatalogEntry>, CatalogError>;

    async fn artist_music_videos(
        &self,
        storefront: &str,
        id: &str,
        token: &str,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    async fn search(
        &self,
        storefront: &str,
        kind: SearchKind,
        term: &str,
        token: &str,
    ) -> Result<Vec<SearchHit>, CatalogError>;
}

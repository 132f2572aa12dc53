use crate::core::catalog::CatalogApi;
use crate::core::metadata::{ArtistProfile, CatalogEntry, SearchHit, SearchKind};
use crate::error::CatalogError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const API_BASE: &str = "https://amp-api.music.apple.com";
const PAGE_LIMIT: usize = 100;
const SEARCH_LIMIT: usize = 15;

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Resource>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    id: String,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Attributes {
    name: String,
    url: String,
    artist_name: Option<String>,
    album_name: Option<String>,
    release_date: Option<String>,
    genre_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: HashMap<String, Page>,
}

impl Resource {
    fn into_entry(self) -> CatalogEntry {
        CatalogEntry {
            id: self.id,
            name: self.attributes.name,
            url: self.attributes.url,
            release_date: self.attributes.release_date,
        }
    }

    fn into_hit(self, kind: SearchKind) -> SearchHit {
        let a = self.attributes;
        let detail = match kind {
            SearchKind::Album => a.artist_name,
            SearchKind::Song => match (a.artist_name, a.album_name) {
                (Some(artist), Some(album)) => Some(format!("{artist} - {album}")),
                (artist, album) => artist.or(album),
            },
            SearchKind::Artist => (!a.genre_names.is_empty()).then(|| a.genre_names.join(", ")),
        };
        SearchHit {
            name: a.name,
            detail,
            url: a.url,
        }
    }
}

/// Catalog lookups against the public Apple Music API.
pub struct AppleMusicClient {
    client: reqwest::Client,
    base: String,
}

impl AppleMusicClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base(client, API_BASE)
    }

    pub fn with_base(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    /// Shared HTTP client with the headers the catalog expects.
    pub fn http_client() -> Result<reqwest::Client, CatalogError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ORIGIN,
            reqwest::header::HeaderValue::from_static("https://music.apple.com"),
        );
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .cookie_store(true)
            .build()?;
        Ok(client)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }

    /// Walks every page of an artist relationship.
    async fn relationship(
        &self,
        storefront: &str,
        id: &str,
        relationship: &str,
        token: &str,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let path = format!("/v1/catalog/{storefront}/artists/{id}/{relationship}");
        let mut entries = Vec::new();
        let mut offset = 0;

        loop {
            let page: Page = self
                .get_json(
                    &path,
                    &[("limit", PAGE_LIMIT.to_string()), ("offset", offset.to_string())],
                    token,
                )
                .await?;
            let count = page.data.len();
            entries.extend(page.data.into_iter().map(Resource::into_entry));
            debug!(relationship, offset, count, "fetched artist page");

            if page.next.is_none() || count == 0 {
                break;
            }
            offset += count;
        }

        Ok(entries)
    }
}

#[async_trait]
impl CatalogApi for AppleMusicClient {
    async fn artist(&self, storefront: &str, id: &str, token: &str) -> Result<ArtistProfile, CatalogError> {
        let path = format!("/v1/catalog/{storefront}/artists/{id}");
        let page: Page = self.get_json(&path, &[], token).await?;
        let artist = page
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("artist {id}")))?;
        Ok(ArtistProfile {
            id: artist.id,
            name: artist.attributes.name,
        })
    }

    async fn artist_albums(&self, storefront: &str, id: &str, token: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.relationship(storefront, id, "albums", token).await
    }

    async fn artist_music_videos(
        &self,
        storefront: &str,
        id: &str,
        token: &str,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.relationship(storefront, id, "music-videos", token).await
    }

    async fn search(
        &self,
        storefront: &str,
        kind: SearchKind,
        term: &str,
        token: &str,
    ) -> Result<Vec<SearchHit>, CatalogError> {
        let path = format!("/v1/catalog/{storefront}/search");
        let query = [
            ("term", term.to_string()),
            ("types", kind.resource().to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
        ];
        let mut response: SearchResponse = self.get_json(&path, &query, token).await?;
        let hits = response
            .results
            .remove(kind.resource())
            .map(|page| page.data)
            .unwrap_or_default();
        Ok(hits.into_iter().map(|r| r.into_hit(kind)).collect())
    }
}

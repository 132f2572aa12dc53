//! Error types shared by the orchestration core and its collaborators.

use thiserror::Error;

/// Failures reported by the catalog web service client.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to acquire authorization token: {0}")]
    Token(String),

    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("catalog returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("unexpected catalog response: {0}")]
    Decode(String),

    #[error("{0} not found in catalog")]
    NotFound(String),
}

/// Result of a media downloader that did not save the item.
///
/// `Unavailable` and `NotSong` are warnings: the run counts them separately and
/// never retries because of them.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("not a song: {0}")]
    NotSong(String),

    #[error("{0}")]
    Failed(String),

    #[error("failed to start downloader: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Fatal failures while turning an artist URL into a download queue.
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("Invalid artist URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to get artist name")]
    ArtistName(#[source] CatalogError),

    #[error("Failed to get artist albums")]
    Albums(#[source] CatalogError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

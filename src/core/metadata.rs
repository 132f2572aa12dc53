use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistProfile {
    pub id: String,
    pub name: String,
}

/// One album or music video listed under an artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub url: String,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Album,
    Song,
    Artist,
}

impl SearchKind {
    /// Resource type name used by the catalog search endpoint.
    pub fn resource(&self) -> &'static str {
        match self {
            SearchKind::Album => "albums",
            SearchKind::Song => "songs",
            SearchKind::Artist => "artists",
        }
    }
}

impl std::str::FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "album" => Ok(SearchKind::Album),
            "song" => Ok(SearchKind::Song),
            "artist" => Ok(SearchKind::Artist),
            other => Err(format!("invalid search type '{other}', use album, song or artist")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub detail: Option<String>,
    pub url: String,
}

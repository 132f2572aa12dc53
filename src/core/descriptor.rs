use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

const CATALOG_HOSTS: [&str; 3] = [
    "music.apple.com",
    "beta.music.apple.com",
    "classical.music.apple.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    Album,
    Song,
    Playlist,
    Artist,
    MusicVideo,
    Station,
    Invalid,
}

impl MediaType {
    /// Path marker used by the catalog web player, e.g. `music-video`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Album => "album",
            MediaType::Song => "song",
            MediaType::Playlist => "playlist",
            MediaType::Artist => "artist",
            MediaType::MusicVideo => "music-video",
            MediaType::Station => "station",
            MediaType::Invalid => "invalid",
        }
    }

    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "album" => Some(MediaType::Album),
            "song" => Some(MediaType::Song),
            "playlist" => Some(MediaType::Playlist),
            "artist" => Some(MediaType::Artist),
            "music-video" => Some(MediaType::MusicVideo),
            "station" => Some(MediaType::Station),
            _ => None,
        }
    }

    fn accepts_id(&self, id: &str) -> bool {
        match self {
            MediaType::Playlist => has_suffix_after(id, "pl."),
            MediaType::Station => has_suffix_after(id, "ra."),
            MediaType::Invalid => false,
            _ => !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()),
        }
    }

    /// Human label used in queue output, e.g. "Music Video".
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Album => "Album",
            MediaType::Song => "Song",
            MediaType::Playlist => "Playlist",
            MediaType::Artist => "Artist",
            MediaType::MusicVideo => "Music Video",
            MediaType::Station => "Station",
            MediaType::Invalid => "Invalid type",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_suffix_after(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .map(|rest| {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
        .unwrap_or(false)
}

/// Parsed form of a catalog URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub media_type: MediaType,
    pub storefront: String,
    pub catalog_id: String,
    pub sub_selector: Option<String>,
}

impl Descriptor {
    pub fn invalid() -> Self {
        Self {
            media_type: MediaType::Invalid,
            storefront: String::new(),
            catalog_id: String::new(),
            sub_selector: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.media_type != MediaType::Invalid
    }

    /// Rebuilds the shortest URL that classifies back to this descriptor.
    pub fn canonical_url(&self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }
        let mut url = Url::parse(&format!(
            "https://music.apple.com/{}/{}/{}",
            self.storefront, self.media_type, self.catalog_id
        ))
        .ok()?;
        if let Some(track) = &self.sub_selector {
            url.query_pairs_mut().append_pair("i", track);
        }
        Some(url.into())
    }
}

/// Classifies a catalog URL by walking its path once.
///
/// The expected layout is `/{storefront}/{kind}/[slug/]{id}`. Anything that
/// does not fit yields [`Descriptor::invalid`], which callers treat as a skip.
pub fn classify(raw: &str) -> Descriptor {
    parse(raw.trim()).unwrap_or_else(Descriptor::invalid)
}

fn parse(raw: &str) -> Option<Descriptor> {
    let url = Url::parse(raw).ok()?;
    if url.scheme() != "https" || !CATALOG_HOSTS.contains(&url.host_str()?) {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    if segments.len() < 3 {
        return None;
    }

    let storefront = segments[0];
    if storefront.len() != 2 || !storefront.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let media_type = MediaType::from_marker(segments[1])?;
    let last = segments[segments.len() - 1];
    let catalog_id = last.strip_prefix("id").filter(|rest| media_type.accepts_id(rest)).unwrap_or(last);
    if !media_type.accepts_id(catalog_id) {
        return None;
    }

    let sub_selector = if media_type == MediaType::Album {
        url.query_pairs()
            .find(|(key, _)| key == "i")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    } else {
        None
    };

    Some(Descriptor {
        media_type,
        storefront: storefront.to_string(),
        catalog_id: catalog_id.to_string(),
        sub_selector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_without_track_selector() {
        let d = classify("https://music.apple.com/us/album/x/1609583573");
        assert_eq!(
            d,
            Descriptor {
                media_type: MediaType::Album,
                storefront: "us".to_string(),
                catalog_id: "1609583573".to_string(),
                sub_selector: None,
            }
        );
    }

    #[test]
    fn test_album_with_track_selector() {
        let d = classify("https://music.apple.com/jp/album/some-name/1609583573?i=1609583580");
        assert_eq!(d.media_type, MediaType::Album);
        assert_eq!(d.storefront, "jp");
        assert_eq!(d.sub_selector.as_deref(), Some("1609583580"));
    }

    #[test]
    fn test_every_kind() {
        let cases = [
            ("https://music.apple.com/us/song/hello/1440818839", MediaType::Song, "1440818839"),
            (
                "https://music.apple.com/us/playlist/todays-hits/pl.f4d106fed2bd41149aaacabb233eb5eb",
                MediaType::Playlist,
                "pl.f4d106fed2bd41149aaacabb233eb5eb",
            ),
            ("https://music.apple.com/gb/artist/adele/262836961", MediaType::Artist, "262836961"),
            ("https://music.apple.com/us/music-video/rolling/1445904633", MediaType::MusicVideo, "1445904633"),
            ("https://music.apple.com/us/station/mix/ra.q-GAI6IDE3OGI0YjY1", MediaType::Station, "ra.q-GAI6IDE3OGI0YjY1"),
            ("https://beta.music.apple.com/ca/album/id1609583573", MediaType::Album, "1609583573"),
            ("https://classical.music.apple.com/de/album/requiem/1500000000", MediaType::Album, "1500000000"),
        ];

        for (url, kind, id) in cases {
            let d = classify(url);
            assert_eq!(d.media_type, kind, "{url}");
            assert_eq!(d.catalog_id, id, "{url}");
            assert!(d.sub_selector.is_none());
        }
    }

    #[test]
    fn test_rejections_are_empty() {
        let rejected = [
            "not-a-url",
            "",
            "http://music.apple.com/us/album/x/1609583573",
            "https://example.com/us/album/x/1609583573",
            "https://music.apple.com/us/album",
            "https://music.apple.com/usa/album/x/1609583573",
            "https://music.apple.com/us/podcast/x/1609583573",
            "https://music.apple.com/us/album/x/not-numeric",
            "https://music.apple.com/us/playlist/x/1234",
            "https://music.apple.com/us/station/x/pl.abc",
        ];

        for url in rejected {
            let d = classify(url);
            assert_eq!(d.media_type, MediaType::Invalid, "{url}");
            assert!(d.storefront.is_empty());
            assert!(d.catalog_id.is_empty());
        }
    }

    #[test]
    fn test_marker_in_slug_does_not_confuse_kind() {
        let d = classify("https://music.apple.com/us/song/album/1440818839");
        assert_eq!(d.media_type, MediaType::Song);
        assert_eq!(d.catalog_id, "1440818839");
    }

    #[test]
    fn test_track_selector_ignored_outside_albums() {
        let d = classify("https://music.apple.com/us/song/x/1440818839?i=99");
        assert_eq!(d.media_type, MediaType::Song);
        assert!(d.sub_selector.is_none());
    }

    #[test]
    fn test_canonical_url_reclassifies() {
        let urls = [
            "https://music.apple.com/us/album/x/1609583573?i=1609583580",
            "https://music.apple.com/jp/playlist/y/pl.u-abc123",
            "https://music.apple.com/fr/station/z/ra.978194965",
            "https://music.apple.com/de/artist/w/12345",
        ];
        for url in urls {
            let d = classify(url);
            let canonical = d.canonical_url().expect("valid descriptor");
            assert_eq!(classify(&canonical), d);
        }
        assert!(Descriptor::invalid().canonical_url().is_none());
    }

    #[test]
    fn test_canonical_url_encodes_track_selector() {
        for raw in ["a%26b", "x%2By", "50%25", "c%23d"] {
            let d = classify(&format!("https://music.apple.com/us/album/x/1609583573?i={raw}"));
            assert!(d.sub_selector.is_some(), "{raw}");

            let canonical = d.canonical_url().expect("valid descriptor");
            assert_eq!(classify(&canonical), d, "{canonical}");
        }

        let d = classify("https://music.apple.com/us/album/x/1609583573?i=a%26b");
        assert_eq!(d.sub_selector.as_deref(), Some("a&b"));
    }
}

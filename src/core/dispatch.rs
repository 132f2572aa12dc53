use crate::config::QualityConfig;
use crate::core::descriptor::{Descriptor, MediaType};
use crate::error::DownloadError;
use crate::utils::music_video_folder;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shortest media-user credential that can be a real token.
const MIN_MEDIA_USER_TOKEN_LEN: usize = 51;

/// Everything a media downloader needs to fetch one catalog item.
#[derive(Debug, Clone)]
pub struct MediaRequest<'a> {
    pub storefront: &'a str,
    pub id: &'a str,
    pub token: &'a str,
    pub media_user_token: &'a str,
    /// Artist folder template, already filled in for artist downloads.
    pub artist_folder: &'a str,
    pub quality: &'a QualityConfig,
}

/// The fetch/decrypt/remux pipeline, one entry point per media type.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    fn name(&self) -> &'static str;
    async fn album(&self, req: &MediaRequest<'_>, track: Option<&str>) -> Result<(), DownloadError>;
    async fn song(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError>;
    async fn playlist(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError>;
    async fn music_video(&self, req: &MediaRequest<'_>, save_dir: &std::path::Path) -> Result<(), DownloadError>;
    async fn station(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError>;
}

/// Looks up helper executables needed by DRM-gated media types.
pub trait ToolLocator: Send + Sync {
    fn is_available(&self, tool: &str) -> bool;
}

/// Searches `PATH` the way a shell would.
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn is_available(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    SkippedPrecondition(String),
    Unavailable(String),
    NotSong(String),
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Settings the router reads for every dispatch; fixed at construction.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub media_user_token: String,
    pub decrypt_tool: String,
    pub save_folder: PathBuf,
    pub artist_folder: String,
}

/// Routes a classified URL to the matching downloader entry point.
///
/// A dispatch is a single attempt; retries are the caller's business.
pub struct DispatchRouter {
    downloader: Arc<dyn MediaDownloader>,
    tools: Arc<dyn ToolLocator>,
    settings: DispatchSettings,
}

impl DispatchRouter {
    pub fn new(
        downloader: Arc<dyn MediaDownloader>,
        tools: Arc<dyn ToolLocator>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            downloader,
            tools,
            settings,
        }
    }

    pub async fn dispatch(&self, descriptor: &Descriptor, token: &str, quality: &QualityConfig) -> Outcome {
        let req = MediaRequest {
            storefront: &descriptor.storefront,
            id: &descriptor.catalog_id,
            token,
            media_user_token: &self.settings.media_user_token,
            artist_folder: &self.settings.artist_folder,
            quality,
        };

        debug!(
            media_type = %descriptor.media_type,
            id = %descriptor.catalog_id,
            downloader = self.downloader.name(),
            "dispatching"
        );

        let result = match descriptor.media_type {
            MediaType::Album => {
                self.downloader
                    .album(&req, descriptor.sub_selector.as_deref())
                    .await
            }
            MediaType::Song => self.downloader.song(&req).await,
            MediaType::Playlist => self.downloader.playlist(&req).await,
            MediaType::MusicVideo => {
                if let Some(reason) = self.music_video_blocker() {
                    info!(id = %descriptor.catalog_id, "{}", reason);
                    return Outcome::SkippedPrecondition(reason);
                }
                let save_dir = self.music_video_dir();
                self.downloader.music_video(&req, &save_dir).await
            }
            MediaType::Station => {
                if !self.has_media_user_token() {
                    let reason = "media-user-token is not set, skip station dl".to_string();
                    info!(id = %descriptor.catalog_id, "{}", reason);
                    return Outcome::SkippedPrecondition(reason);
                }
                self.downloader.station(&req).await
            }
            MediaType::Artist => {
                return Outcome::Failed("artist URLs must be expanded before dispatch".to_string())
            }
            MediaType::Invalid => return Outcome::Failed("invalid URL".to_string()),
        };

        match result {
            Ok(()) => Outcome::Success,
            Err(DownloadError::Unavailable(reason)) => Outcome::Unavailable(reason),
            Err(DownloadError::NotSong(reason)) => Outcome::NotSong(reason),
            Err(err) => {
                warn!(id = %descriptor.catalog_id, error = %err, "download failed");
                Outcome::Failed(err.to_string())
            }
        }
    }

    fn has_media_user_token(&self) -> bool {
        self.settings.media_user_token.len() >= MIN_MEDIA_USER_TOKEN_LEN
    }

    fn music_video_blocker(&self) -> Option<String> {
        if !self.has_media_user_token() {
            return Some("media-user-token is not set, skip MV dl".to_string());
        }
        if !self.tools.is_available(&self.settings.decrypt_tool) {
            return Some(format!("{} is not found, skip MV dl", self.settings.decrypt_tool));
        }
        None
    }

    fn music_video_dir(&self) -> PathBuf {
        match music_video_folder(&self.settings.artist_folder) {
            Some(folder) => self.settings.save_folder.join(folder),
            None => self.settings.save_folder.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::descriptor::classify;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Downloader double that records calls and fails on request.
    #[derive(Default)]
    pub(crate) struct ScriptedDownloader {
        pub calls: Mutex<Vec<String>>,
        pub failures: Mutex<HashMap<String, String>>,
    }

    impl ScriptedDownloader {
        pub(crate) fn fail(&self, id: &str, reason: &str) {
            self.failures.lock().insert(id.to_string(), reason.to_string());
        }

        fn record(&self, call: String, id: &str) -> Result<(), DownloadError> {
            self.calls.lock().push(call);
            match self.failures.lock().get(id) {
                Some(reason) if reason.starts_with("unavailable") => {
                    Err(DownloadError::Unavailable(reason.clone()))
                }
                Some(reason) => Err(DownloadError::Failed(reason.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl MediaDownloader for ScriptedDownloader {
        fn name(&self) -> &'static str {
            "scripted"
        }
        async fn album(&self, req: &MediaRequest<'_>, track: Option<&str>) -> Result<(), DownloadError> {
            self.record(format!("album:{}:{}", req.id, track.unwrap_or("")), req.id)
        }
        async fn song(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError> {
            self.record(format!("song:{}", req.id), req.id)
        }
        async fn playlist(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError> {
            self.record(format!("playlist:{}", req.id), req.id)
        }
        async fn music_video(&self, req: &MediaRequest<'_>, save_dir: &std::path::Path) -> Result<(), DownloadError> {
            self.record(format!("mv:{}:{}", req.id, save_dir.display()), req.id)
        }
        async fn station(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError> {
            self.record(format!("station:{}", req.id), req.id)
        }
    }

    pub(crate) struct FixedTools(pub bool);

    impl ToolLocator for FixedTools {
        fn is_available(&self, _tool: &str) -> bool {
            self.0
        }
    }

    pub(crate) fn router(downloader: Arc<ScriptedDownloader>, token_len: usize, tool: bool) -> DispatchRouter {
        DispatchRouter::new(
            downloader,
            Arc::new(FixedTools(tool)),
            DispatchSettings {
                media_user_token: "m".repeat(token_len),
                decrypt_tool: "mp4decrypt".to_string(),
                save_folder: PathBuf::from("out"),
                artist_folder: "{UrlArtistName}".to_string(),
            },
        )
    }

    fn quality() -> QualityConfig {
        QualityConfig::from_config(&Config::default())
    }

    #[tokio::test]
    async fn test_album_passes_track_selector() {
        let downloader = Arc::new(ScriptedDownloader::default());
        let router = router(downloader.clone(), 0, false);
        let d = classify("https://music.apple.com/us/album/x/1609583573?i=42");

        assert_eq!(router.dispatch(&d, "t", &quality()).await, Outcome::Success);
        assert_eq!(downloader.calls.lock().as_slice(), ["album:1609583573:42"]);
    }

    #[tokio::test]
    async fn test_short_credential_skips_music_video() {
        let downloader = Arc::new(ScriptedDownloader::default());
        let router = router(downloader.clone(), 50, true);
        let d = classify("https://music.apple.com/us/music-video/x/1445904633");

        let outcome = router.dispatch(&d, "t", &quality()).await;
        assert!(matches!(outcome, Outcome::SkippedPrecondition(_)));
        assert!(downloader.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_decrypt_tool_skips_music_video() {
        let downloader = Arc::new(ScriptedDownloader::default());
        let router = router(downloader.clone(), 64, false);
        let d = classify("https://music.apple.com/us/music-video/x/1445904633");

        match router.dispatch(&d, "t", &quality()).await {
            Outcome::SkippedPrecondition(reason) => assert!(reason.contains("mp4decrypt")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_station_gate_ignores_decrypt_tool() {
        let downloader = Arc::new(ScriptedDownloader::default());
        let d = classify("https://music.apple.com/us/station/x/ra.978194965");

        let gated = router(downloader.clone(), 10, true);
        assert!(matches!(
            gated.dispatch(&d, "t", &quality()).await,
            Outcome::SkippedPrecondition(_)
        ));

        let open = router(downloader.clone(), 64, false);
        assert_eq!(open.dispatch(&d, "t", &quality()).await, Outcome::Success);
        assert_eq!(downloader.calls.lock().as_slice(), ["station:ra.978194965"]);
    }

    #[tokio::test]
    async fn test_collaborator_error_is_carried_verbatim() {
        let downloader = Arc::new(ScriptedDownloader::default());
        downloader.fail("1440818839", "no stream for track");
        let router = router(downloader, 0, false);
        let d = classify("https://music.apple.com/us/song/x/1440818839");

        assert_eq!(
            router.dispatch(&d, "t", &quality()).await,
            Outcome::Failed("no stream for track".to_string())
        );
    }

    #[tokio::test]
    async fn test_unavailable_is_not_a_failure() {
        let downloader = Arc::new(ScriptedDownloader::default());
        downloader.fail("1440818839", "unavailable in storefront");
        let router = router(downloader, 0, false);
        let d = classify("https://music.apple.com/us/song/x/1440818839");

        let outcome = router.dispatch(&d, "t", &quality()).await;
        assert!(matches!(outcome, Outcome::Unavailable(_)));
        assert!(!outcome.is_failure());
    }

    #[tokio::test]
    async fn test_artist_and_invalid_are_not_dispatched() {
        let downloader = Arc::new(ScriptedDownloader::default());
        let router = router(downloader.clone(), 64, true);

        let artist = classify("https://music.apple.com/us/artist/x/262836961");
        assert!(router.dispatch(&artist, "t", &quality()).await.is_failure());
        assert!(router.dispatch(&Descriptor::invalid(), "t", &quality()).await.is_failure());
        assert!(downloader.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_music_video_saved_under_artist_folder() {
        let downloader = Arc::new(ScriptedDownloader::default());
        let router = DispatchRouter::new(
            downloader.clone(),
            Arc::new(FixedTools(true)),
            DispatchSettings {
                media_user_token: "m".repeat(64),
                decrypt_tool: "mp4decrypt".to_string(),
                save_folder: PathBuf::from("out"),
                artist_folder: "Videos".to_string(),
            },
        );
        let d = classify("https://music.apple.com/us/music-video/x/1445904633");

        assert_eq!(router.dispatch(&d, "t", &quality()).await, Outcome::Success);
        let expected = format!("mv:1445904633:{}", PathBuf::from("out").join("Videos").display());
        assert_eq!(downloader.calls.lock().as_slice(), [expected]);
    }
}

use crate::core::dispatch::{MediaDownloader, MediaRequest};
use crate::error::DownloadError;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs an external media pipeline program once per catalog item.
///
/// The program receives the media kind as its first argument and reports the
/// result through its exit status. A failing run whose stderr starts with
/// `unavailable:` or `not-song:` is reported as a warning instead of an error.
/// Credentials travel in `AMDL_TOKEN` and `AMDL_MEDIA_USER_TOKEN`, never on
/// the command line.
pub struct ProcessDownloader {
    program: String,
}

impl ProcessDownloader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn build_args(kind: &str, req: &MediaRequest<'_>) -> Vec<String> {
        let q = req.quality;
        let mut args = vec![
            kind.to_string(),
            "--storefront".to_string(),
            req.storefront.to_string(),
            "--id".to_string(),
            req.id.to_string(),
            "--artist-folder".to_string(),
            req.artist_folder.to_string(),
            "--alac-max".to_string(),
            q.alac_max.to_string(),
            "--atmos-max".to_string(),
            q.atmos_max.to_string(),
            "--aac-type".to_string(),
            q.aac_type.clone(),
            "--mv-audio-type".to_string(),
            q.mv_audio_type.clone(),
            "--mv-max".to_string(),
            q.mv_max.to_string(),
        ];
        for (enabled, flag) in [
            (q.atmos, "--atmos"),
            (q.aac, "--aac"),
            (q.song_only, "--song"),
            (q.select, "--select"),
            (q.debug, "--debug"),
        ] {
            if enabled {
                args.push(flag.to_string());
            }
        }
        args
    }

    async fn run(&self, args: Vec<String>, req: &MediaRequest<'_>) -> Result<(), DownloadError> {
        debug!(program = %self.program, kind = %args[0], id = req.id, "spawning downloader");

        let output = Command::new(&self.program)
            .args(&args)
            .env("AMDL_TOKEN", req.token)
            .env("AMDL_MEDIA_USER_TOKEN", req.media_user_token)
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            info!(id = req.id, "download finished");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(classify_failure(stderr.trim(), output.status.code()))
    }
}

fn classify_failure(stderr: &str, code: Option<i32>) -> DownloadError {
    if let Some(rest) = stderr.strip_prefix("unavailable:") {
        return DownloadError::Unavailable(rest.trim().to_string());
    }
    if let Some(rest) = stderr.strip_prefix("not-song:") {
        return DownloadError::NotSong(rest.trim().to_string());
    }
    if stderr.is_empty() {
        return match code {
            Some(code) => DownloadError::Failed(format!("downloader exited with code {code}")),
            None => DownloadError::Failed("downloader terminated by signal".to_string()),
        };
    }
    DownloadError::Failed(stderr.to_string())
}

#[async_trait]
impl MediaDownloader for ProcessDownloader {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn album(&self, req: &MediaRequest<'_>, track: Option<&str>) -> Result<(), DownloadError> {
        let mut args = Self::build_args("album", req);
        if let Some(track) = track {
            args.push("--track".to_string());
            args.push(track.to_string());
        }
        self.run(args, req).await
    }

    async fn song(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError> {
        self.run(Self::build_args("song", req), req).await
    }

    async fn playlist(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError> {
        self.run(Self::build_args("playlist", req), req).await
    }

    async fn music_video(&self, req: &MediaRequest<'_>, save_dir: &Path) -> Result<(), DownloadError> {
        let mut args = Self::build_args("music-video", req);
        args.push("--output".to_string());
        args.push(save_dir.display().to_string());
        self.run(args, req).await
    }

    async fn station(&self, req: &MediaRequest<'_>) -> Result<(), DownloadError> {
        self.run(Self::build_args("station", req), req).await
    }
}

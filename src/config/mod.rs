use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
const TOKEN_PLACEHOLDER: &str = "your-authorization-token";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub storefront: String,
    pub media_user_token: String,
    pub authorization_token: String,
    pub alac_save_folder: PathBuf,
    pub artist_folder_format: String,
    pub limit_max: usize,
    pub alac_max: u32,
    pub atmos_max: u32,
    pub aac_type: String,
    pub mv_audio_type: String,
    pub mv_max: u32,
    pub decrypt_tool: String,
    pub downloader_command: String,
    pub max_concurrent_tasks: usize,
    pub task_ttl_secs: u64,
    pub max_tasks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storefront: "us".to_string(),
            media_user_token: String::new(),
            authorization_token: TOKEN_PLACEHOLDER.to_string(),
            alac_save_folder: PathBuf::from("AM-DL downloads"),
            artist_folder_format: "{UrlArtistName}".to_string(),
            limit_max: 200,
            alac_max: 192000,
            atmos_max: 2768,
            aac_type: "aac-lc".to_string(),
            mv_audio_type: "atmos".to_string(),
            mv_max: 2160,
            decrypt_tool: "mp4decrypt".to_string(),
            downloader_command: "amdl-pipeline".to_string(),
            max_concurrent_tasks: 4,
            task_ttl_secs: 3600,
            max_tasks: 500,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(raw)?;
        if config.storefront.chars().count() != 2 {
            config.storefront = "us".to_string();
        }
        Ok(config)
    }

    /// Manually configured bearer token, if it is set to something real.
    pub fn fallback_token(&self) -> Option<String> {
        let token = self.authorization_token.trim();
        if token.is_empty() || token == TOKEN_PLACEHOLDER {
            return None;
        }
        Some(token.replace("Bearer ", ""))
    }

    pub fn task_ttl(&self) -> Duration {
        Duration::from_secs(self.task_ttl_secs)
    }

    /// Copy safe to hand out over the API.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.media_user_token.is_empty() {
            config.media_user_token = "<redacted>".to_string();
        }
        if config.fallback_token().is_some() {
            config.authorization_token = "<redacted>".to_string();
        }
        config
    }
}

/// Quality selection for one run or one server task.
///
/// Built once and passed by value; nothing mutates it after a download starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityConfig {
    pub atmos: bool,
    pub aac: bool,
    pub song_only: bool,
    pub select: bool,
    pub debug: bool,
    pub alac_max: u32,
    pub atmos_max: u32,
    pub aac_type: String,
    pub mv_audio_type: String,
    pub mv_max: u32,
}

impl QualityConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            atmos: false,
            aac: false,
            song_only: false,
            select: false,
            debug: false,
            alac_max: config.alac_max,
            atmos_max: config.atmos_max,
            aac_type: config.aac_type.clone(),
            mv_audio_type: config.mv_audio_type.clone(),
            mv_max: config.mv_max,
        }
    }

    /// Applies a web form preset (`alac`, `aac` or `atmos`) on top of `self`.
    pub fn with_preset(&self, preset: &str) -> Self {
        let mut quality = self.clone();
        quality.atmos = false;
        quality.aac = false;
        match preset {
            "atmos" => quality.atmos = true,
            "aac" => {
                quality.aac = true;
                quality.aac_type = "aac".to_string();
            }
            _ => {}
        }
        quality
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_quality_presets_do_not_leak() {
        let base = QualityConfig::from_config(&Config::default());
        let aac = base.with_preset("aac");
        assert!(aac.aac);
        assert_eq!(aac.aac_type, "aac");

        let atmos = aac.with_preset("atmos");
        assert!(atmos.atmos);
        assert!(!atmos.aac);

        let alac = base.with_preset("alac");
        assert_eq!(alac, base);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = Config::from_toml("storefront = \"jp\"\nalac-max = 96000\n").unwrap();
        assert_eq!(config.storefront, "jp");
        assert_eq!(config.alac_max, 96000);
        assert_eq!(config.decrypt_tool, "mp4decrypt");
        assert_eq!(config.limit_max, 200);
    }

    #[test]
    fn test_bad_storefront_falls_back_to_us() {
        let config = Config::from_toml("storefront = \"usa\"").unwrap();
        assert_eq!(config.storefront, "us");
    }

    #[test]
    fn test_fallback_token() {
        let mut config = Config::default();
        assert_eq!(config.fallback_token(), None);

        config.authorization_token = "Bearer eyJhbGci".to_string();
        assert_eq!(config.fallback_token().as_deref(), Some("eyJhbGci"));

        config.authorization_token = String::new();
        assert_eq!(config.fallback_token(), None);
    }

    #[test]
    fn test_redacted_hides_credentials() {
        let mut config = Config::default();
        config.media_user_token = "x".repeat(60);
        let redacted = config.redacted();
        assert_eq!(redacted.media_user_token, "<redacted>");
        assert_eq!(redacted.authorization_token, TOKEN_PLACEHOLDER);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "media-user-token = \"abc\"\nmax-concurrent-tasks = 2").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.media_user_token, "abc");
        assert_eq!(config.max_concurrent_tasks, 2);

        assert!(matches!(
            Config::load("/nonexistent/config.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}

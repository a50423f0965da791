//! Startup configuration.
//!
//! Defaults overridden by `REELGRAB_*` environment variables. Read once when
//! the application starts; nothing is written back.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use log::LevelFilter;

use crate::logging::LogDestination;

pub const ENV_YTDLP: &str = "REELGRAB_YTDLP";
pub const ENV_FFMPEG: &str = "REELGRAB_FFMPEG";
pub const ENV_DOWNLOAD_DIR: &str = "REELGRAB_DOWNLOAD_DIR";
pub const ENV_THUMBNAIL_TIMEOUT: &str = "REELGRAB_THUMBNAIL_TIMEOUT_SECS";
pub const ENV_LOG: &str = "REELGRAB_LOG";
pub const ENV_LOG_TO: &str = "REELGRAB_LOG_TO";

const DEFAULT_THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Explicit engine binary
    pub ytdlp: Option<PathBuf>,
    /// Explicit transcoder binary
    pub ffmpeg: Option<PathBuf>,
    /// Folder preselected in the UI
    pub download_dir: PathBuf,
    pub thumbnail_timeout: Duration,
    pub log_level: LevelFilter,
    pub log_destination: LogDestination,
    /// Problems found while reading the environment. Logged once the logger
    /// is up, since the log level itself comes from here.
    pub warnings: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let mut warnings = Vec::new();

        let thumbnail_timeout = match value(ENV_THUMBNAIL_TIMEOUT) {
            None => DEFAULT_THUMBNAIL_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warnings.push(format!(
                        "{ENV_THUMBNAIL_TIMEOUT}={raw:?} is not a positive number of seconds"
                    ));
                    DEFAULT_THUMBNAIL_TIMEOUT
                }
            },
        };

        let log_level = match value(ENV_LOG) {
            None => LevelFilter::Info,
            Some(raw) => raw.parse::<LevelFilter>().unwrap_or_else(|_| {
                warnings.push(format!("{ENV_LOG}={raw:?} is not a log level"));
                LevelFilter::Info
            }),
        };

        let log_destination = match value(ENV_LOG_TO) {
            None => LogDestination::default(),
            Some(raw) => LogDestination::parse(&raw).unwrap_or_else(|| {
                warnings.push(format!("{ENV_LOG_TO}={raw:?} is not one of file, terminal, both"));
                LogDestination::default()
            }),
        };

        Self {
            ytdlp: value(ENV_YTDLP).map(PathBuf::from),
            ffmpeg: value(ENV_FFMPEG).map(PathBuf::from),
            download_dir: value(ENV_DOWNLOAD_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(default_download_dir),
            thumbnail_timeout,
            log_level,
            log_destination,
            warnings,
        }
    }

    /// Transcoder to hand to the engine: explicit path, else one shipped
    /// next to the executable, else none.
    pub fn transcoder(&self) -> Option<PathBuf> {
        self.ffmpeg.clone().or_else(bundled_ffmpeg_path)
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `<dir>/ffmpeg/bin/ffmpeg`, with `.exe` on Windows
pub fn ffmpeg_candidate(dir: &Path) -> PathBuf {
    let bin = if cfg!(target_os = "windows") { "ffmpeg.exe" } else { "ffmpeg" };
    dir.join("ffmpeg").join("bin").join(bin)
}

/// Transcoder bundled beside the running executable, if present
pub fn bundled_ffmpeg_path() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let candidate = ffmpeg_candidate(exe.parent()?);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]);
        assert_eq!(cfg.ytdlp, None);
        assert_eq!(cfg.ffmpeg, None);
        assert_eq!(cfg.thumbnail_timeout, Duration::from_secs(15));
        assert_eq!(cfg.log_level, LevelFilter::Info);
        assert_eq!(cfg.log_destination, LogDestination::Both);
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = config(&[
            (ENV_YTDLP, "/opt/yt-dlp"),
            (ENV_FFMPEG, " /opt/ffmpeg "),
            (ENV_DOWNLOAD_DIR, "/media/videos"),
            (ENV_THUMBNAIL_TIMEOUT, "3"),
            (ENV_LOG, "debug"),
            (ENV_LOG_TO, "Terminal"),
        ]);
        assert_eq!(cfg.ytdlp, Some(PathBuf::from("/opt/yt-dlp")));
        assert_eq!(cfg.ffmpeg, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(cfg.download_dir, PathBuf::from("/media/videos"));
        assert_eq!(cfg.thumbnail_timeout, Duration::from_secs(3));
        assert_eq!(cfg.log_level, LevelFilter::Debug);
        assert_eq!(cfg.log_destination, LogDestination::Terminal);
        assert_eq!(cfg.transcoder(), Some(PathBuf::from("/opt/ffmpeg")));
    }

    #[test]
    fn bad_values_fall_back_with_warnings() {
        let cfg = config(&[(ENV_THUMBNAIL_TIMEOUT, "0"), (ENV_LOG, "loud"), (ENV_YTDLP, "  ")]);
        assert_eq!(cfg.thumbnail_timeout, Duration::from_secs(15));
        assert_eq!(cfg.log_level, LevelFilter::Info);
        assert_eq!(cfg.ytdlp, None);
        assert_eq!(cfg.warnings.len(), 2);
    }

    #[test]
    fn log_destination_accepts_file_only() {
        let cfg = config(&[(ENV_LOG_TO, " file ")]);
        assert_eq!(cfg.log_destination, LogDestination::File);
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn unknown_log_destination_falls_back_to_both() {
        let cfg = config(&[(ENV_LOG_TO, "syslog")]);
        assert_eq!(cfg.log_destination, LogDestination::Both);
        assert_eq!(cfg.warnings.len(), 1);
        assert!(cfg.warnings[0].contains(ENV_LOG_TO), "{:?}", cfg.warnings);
    }

    #[test]
    fn ffmpeg_candidate_follows_bundle_layout() {
        let dir = tempfile::tempdir().unwrap();
        let candidate = ffmpeg_candidate(dir.path());
        assert!(candidate.starts_with(dir.path().join("ffmpeg").join("bin")));
        assert!(!candidate.is_file());
    }
}

//! The seam between the task runner and the external download engine.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::progress::RawProgress;

/// One invocation of the engine in download mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// URLs fetched one after another by the engine
    pub urls: Vec<String>,
    /// Output path template, e.g. `/videos/%(title)s.%(ext)s`
    pub output_template: String,
    /// Format selector string
    pub format_selector: String,
    /// Convert the result to this audio codec after download
    pub extract_audio: Option<String>,
    /// Transcoder binary; `None` lets the engine search `PATH`
    pub transcoder: Option<PathBuf>,
}

/// Metadata record returned by the engine in query mode
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub webpage_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("{message}{}", exit_code_note(.code))]
    Exited { code: Option<i32>, message: String },
    #[error("unreadable metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// ` (exit code N)`, or nothing when the process was killed by a signal
fn exit_code_note(code: &Option<i32>) -> String {
    code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
}

/// A blocking-from-the-caller's-view download engine.
///
/// `download` invokes `on_progress` zero or more times, in order, before it
/// returns.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn download(
        &self,
        request: &DownloadRequest,
        on_progress: &mut (dyn FnMut(RawProgress) + Send),
    ) -> Result<(), EngineError>;

    async fn probe(&self, url: &str) -> Result<VideoMetadata, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn metadata_reads_dump_and_ignores_extra_fields() {
        let json = r#"{
            "id": "aqz-KE-bpKQ",
            "title": "Big Buck Bunny 60fps 4K",
            "duration": 635,
            "thumbnail": "https://i.ytimg.com/vi/aqz-KE-bpKQ/maxresdefault.jpg",
            "webpage_url": "https://www.youtube.com/watch?v=aqz-KE-bpKQ",
            "formats": [{"format_id": "18"}],
            "view_count": 1
        }"#;
        let meta: VideoMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(
            meta,
            VideoMetadata {
                title: "Big Buck Bunny 60fps 4K".into(),
                duration: Some(635.0),
                thumbnail: Some("https://i.ytimg.com/vi/aqz-KE-bpKQ/maxresdefault.jpg".into()),
                webpage_url: Some("https://www.youtube.com/watch?v=aqz-KE-bpKQ".into()),
            }
        );
    }

    #[test]
    fn metadata_tolerates_missing_optional_fields() {
        let meta: VideoMetadata = serde_json::from_str(r#"{"title": "Live"}"#).unwrap();
        assert_eq!(meta.duration, None);
        assert_eq!(meta.thumbnail, None);
        assert_eq!(meta.webpage_url, None);
    }

    #[test]
    fn exit_failure_shows_plain_exit_code() {
        let err = EngineError::Exited {
            code: Some(1),
            message: "[youtube] abc: Video unavailable".into(),
        };
        assert_eq!(err.to_string(), "[youtube] abc: Video unavailable (exit code 1)");
    }

    #[test]
    fn signal_termination_omits_exit_code() {
        let err = EngineError::Exited {
            code: None,
            message: "yt-dlp exited unsuccessfully".into(),
        };
        assert_eq!(err.to_string(), "yt-dlp exited unsuccessfully");
    }
}

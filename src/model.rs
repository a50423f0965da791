use std::{fmt, path::PathBuf};

/// Identifier handed out by the task runner for every started job
pub type JobId = u64;

/// The two kinds of background work, each with its own slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Batch download of one or more URLs
    Download,
    /// Metadata and thumbnail lookup for a single URL
    PreviewFetch,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Download => f.write_str("download"),
            JobKind::PreviewFetch => f.write_str("preview"),
        }
    }
}

/// Output format offered in the dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormatChoice {
    #[default]
    BestVideo,
    BestAudio,
    Mp4Hd,
    Mp4FullHd,
    Mp4Qhd,
    Mp4Uhd,
    Mp3,
}

impl FormatChoice {
    /// Every choice, in dropdown order
    pub const ALL: [FormatChoice; 7] = [
        FormatChoice::BestVideo,
        FormatChoice::BestAudio,
        FormatChoice::Mp4Hd,
        FormatChoice::Mp4FullHd,
        FormatChoice::Mp4Qhd,
        FormatChoice::Mp4Uhd,
        FormatChoice::Mp3,
    ];

    /// Text shown in the dropdown
    pub fn label(self) -> &'static str {
        match self {
            FormatChoice::BestVideo => "Best Video",
            FormatChoice::BestAudio => "Best Audio",
            FormatChoice::Mp4Hd => "MP4 720p",
            FormatChoice::Mp4FullHd => "MP4 1080p",
            FormatChoice::Mp4Qhd => "MP4 1440p",
            FormatChoice::Mp4Uhd => "MP4 4K",
            FormatChoice::Mp3 => "MP3",
        }
    }

    /// Format selector passed to the engine's `-f` option
    pub fn selector(self) -> &'static str {
        match self {
            FormatChoice::BestVideo => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]",
            FormatChoice::BestAudio => "bestaudio[ext=m4a]/bestaudio",
            FormatChoice::Mp4Hd => {
                "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]"
            }
            FormatChoice::Mp4FullHd => {
                "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]"
            }
            FormatChoice::Mp4Qhd => {
                "bestvideo[height<=1440][ext=mp4]+bestaudio[ext=m4a]/best[height<=1440][ext=mp4]"
            }
            FormatChoice::Mp4Uhd => {
                "bestvideo[height>=2160][ext=mp4]+bestaudio[ext=m4a]/best[height>=2160][ext=mp4]"
            }
            FormatChoice::Mp3 => "bestaudio[ext=mp3]/bestaudio",
        }
    }

    /// Audio codec the transcoder should convert to after download, if any
    pub fn extract_audio(self) -> Option<&'static str> {
        match self {
            FormatChoice::Mp3 => Some("mp3"),
            _ => None,
        }
    }
}

/// User choices that shape a download job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Selected output format
    pub format: FormatChoice,
    /// Folder the engine writes into
    pub destination: PathBuf,
}

impl DownloadOptions {
    /// Engine output template: `<destination>/%(title)s.%(ext)s`
    pub fn output_template(&self) -> String {
        self.destination
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }
}

/// Everything the preview dialog shows for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInfo {
    /// Video title as reported by the engine
    pub title: String,
    /// Length in whole seconds; absent for live streams and some sites
    pub duration_seconds: Option<u64>,
    /// Encoded thumbnail image; never empty when present
    pub thumbnail: Option<Vec<u8>>,
    /// Canonical page URL, used by "View in browser"
    pub page_url: String,
}

/// Splits the URL text box into one URL per non-blank line
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Formats seconds as `h:mm:ss`, or `m:ss` under an hour
pub fn format_duration(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

//! Engine progress payloads and their normalized, UI-facing shape.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix the engine puts in front of every progress line we ask it for
pub const PROGRESS_MARKER: &str = "reelgrab|";

/// `--progress-template` value that makes the engine print
/// `reelgrab|<status>|<percent>|<speed>` once per progress callback
pub const PROGRESS_TEMPLATE: &str =
    "download:reelgrab|%(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s";

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("static regex is valid")
});

/// Progress callback payload as the engine reports it: loosely formatted
/// strings, possibly with terminal colouring.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawProgress {
    pub status: String,
    pub percent: Option<String>,
    pub speed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Downloading,
    Finished,
}

/// One progress notification relayed to the UI
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    /// Always within `0.0..=100.0`; exactly `100.0` when finished
    pub percent: f32,
    /// Human-readable rate such as `2.31MiB/s`
    pub speed: Option<String>,
}

impl ProgressEvent {
    /// Normalizes an engine payload. Statuses other than `downloading` and
    /// `finished` (e.g. `error`) are not progress and yield `None`.
    pub fn from_raw(raw: &RawProgress) -> Option<Self> {
        match strip_ansi(&raw.status).trim() {
            "downloading" => Some(Self {
                status: ProgressStatus::Downloading,
                percent: raw.percent.as_deref().and_then(parse_percent).unwrap_or(0.0),
                speed: raw.speed.as_deref().and_then(normalize_speed),
            }),
            "finished" => Some(Self {
                status: ProgressStatus::Finished,
                percent: 100.0,
                speed: None,
            }),
            other => {
                debug!("Ignoring progress payload with status {other:?}");
                None
            }
        }
    }
}

/// Parses one line of engine stdout into a progress payload, if it is one
pub fn parse_progress_from_line(line: &str) -> Option<RawProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let mut fields = rest.splitn(3, '|');
    let status = fields.next()?.trim().to_owned();
    if status.is_empty() {
        return None;
    }
    let percent = fields.next().map(|f| f.trim().to_owned());
    let speed = fields.next().map(|f| f.trim().to_owned());
    Some(RawProgress {
        status,
        percent,
        speed,
    })
}

pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

fn parse_percent(text: &str) -> Option<f32> {
    let cleaned = strip_ansi(text);
    let number = cleaned.trim().trim_end_matches('%').trim();
    let value = number.parse::<f32>().ok()?;
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}

fn normalize_speed(text: &str) -> Option<String> {
    let cleaned = strip_ansi(text);
    let speed = cleaned.trim();
    match speed {
        "" | "N/A" | "NA" | "Unknown" | "Unknown B/s" => None,
        _ => Some(speed.to_owned()),
    }
}

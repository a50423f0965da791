//! Batch video downloader core: a task runner that drives the `yt-dlp` engine
//! off the UI thread and relays its progress back as typed events.

pub mod config;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod progress;
pub mod runner;
pub mod thumbnail;

pub use engine::{DownloadRequest, Engine, EngineError, VideoMetadata};
pub use error::{AppError, StartError};
pub use model::{DownloadOptions, FormatChoice, JobId, JobKind, PreviewInfo};
pub use progress::{ProgressEvent, ProgressStatus, RawProgress};
pub use runner::{EventReceiver, RepaintHook, RunnerSettings, TaskEvent, TaskRunner};
pub use thumbnail::{FetchError, HttpThumbnailFetcher, ThumbnailFetcher};

use std::{
    collections::VecDeque,
    io::{self, Write},
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use log::{debug, info, warn};
use rust_embed::RustEmbed;
use tempfile::NamedTempFile;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};

use crate::engine::{DownloadRequest, Engine, EngineError, VideoMetadata};
use crate::progress::{PROGRESS_TEMPLATE, RawProgress, parse_progress_from_line, strip_ansi};

/// Stderr lines kept around to explain a failed run
const STDERR_TAIL: usize = 20;

#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

/// File name of the engine binary on this platform
pub fn ytdlp_binary_name() -> &'static str {
    if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" }
}

/// Per-user directory the bundled engine is unpacked into
pub fn bundled_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("reelgrab"))
}

/// Picks the engine binary: an explicit path wins, then a binary bundled
/// into the executable, then whatever `yt-dlp` resolves to on `PATH`.
pub fn locate_ytdlp(configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    let Some(dir) = bundled_dir() else {
        debug!("No cache directory; relying on PATH for the engine");
        return PathBuf::from(ytdlp_binary_name());
    };
    match extract_bundled(ytdlp_binary_name(), &dir) {
        Ok(Some(path)) => {
            info!("Using bundled engine at {}", path.display());
            path
        }
        Ok(None) => PathBuf::from(ytdlp_binary_name()),
        Err(err) => {
            warn!("Could not extract bundled engine into {}: {err}", dir.display());
            PathBuf::from(ytdlp_binary_name())
        }
    }
}

/// Writes the embedded asset `name` into `dir` unless a byte-identical copy
/// is already there. `Ok(None)` when nothing is bundled under that name.
///
/// The file is written next to its target and renamed into place, so a
/// concurrent launch never executes a half-written binary.
pub fn extract_bundled(name: &str, dir: &Path) -> io::Result<Option<PathBuf>> {
    let Some(data) = Asset::get(name) else {
        return Ok(None);
    };
    let target = dir.join(name);
    let up_to_date = std::fs::read(&target)
        .map(|existing| existing == data.data.as_ref())
        .unwrap_or(false);
    if up_to_date {
        return Ok(Some(target));
    }

    std::fs::create_dir_all(dir)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(&data.data)?;
    staged.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(0o755))?;
    }
    staged.persist(&target).map_err(|err| err.error)?;
    debug!("Extracted {name} to {}", target.display());
    Ok(Some(target))
}

/// Command-line arguments for a download run
pub fn download_args(request: &DownloadRequest) -> Vec<String> {
    let mut args = vec![
        "--newline".to_owned(),
        // Stop at the first broken URL so its error is the one reported.
        "--abort-on-error".to_owned(),
        "--no-colors".to_owned(),
        "--progress-template".to_owned(),
        PROGRESS_TEMPLATE.to_owned(),
        "-f".to_owned(),
        request.format_selector.clone(),
        "-o".to_owned(),
        request.output_template.clone(),
    ];

    if let Some(transcoder) = &request.transcoder {
        args.push("--ffmpeg-location".to_owned());
        args.push(transcoder.to_string_lossy().into_owned());
    }
    if let Some(codec) = &request.extract_audio {
        args.push("-x".to_owned());
        args.push("--audio-format".to_owned());
        args.push(codec.clone());
    }

    // URLs never get read as options, even if one starts with '-'.
    args.push("--".to_owned());
    args.extend(request.urls.iter().cloned());
    args
}

/// Command-line arguments for a metadata-only query
pub fn probe_args(url: &str) -> Vec<String> {
    vec![
        "--dump-single-json".to_owned(),
        "--skip-download".to_owned(),
        "--no-playlist".to_owned(),
        "--no-warnings".to_owned(),
        "--no-colors".to_owned(),
        "--".to_owned(),
        url.to_owned(),
    ]
}

/// Condenses the engine's stderr into one readable line
pub fn failure_message<S: AsRef<str>>(stderr: &[S]) -> String {
    let lines: Vec<String> = stderr
        .iter()
        .map(|l| strip_ansi(l.as_ref()).trim().to_owned())
        .filter(|l| !l.is_empty())
        .collect();
    lines
        .iter()
        .rev()
        .find_map(|l| l.strip_prefix("ERROR:").map(|rest| rest.trim().to_owned()))
        .or_else(|| lines.last().cloned())
        .unwrap_or_else(|| "yt-dlp exited unsuccessfully".to_owned())
}

async fn collect_stderr<R: AsyncRead + Unpin>(stderr: R) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL);
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("yt-dlp! {line}");
        if tail.len() == STDERR_TAIL {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail
}

/// Drives the `yt-dlp` executable as a child process
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, source: io::Error) -> EngineError {
        EngineError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl Engine for YtDlp {
    async fn download(
        &self,
        request: &DownloadRequest,
        on_progress: &mut (dyn FnMut(RawProgress) + Send),
    ) -> Result<(), EngineError> {
        let args = download_args(request);
        debug!("Running {} {:?}", self.program.display(), args);

        let mut child = self.command(&args).spawn().map_err(|e| self.spawn_error(e))?;
        let out = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("engine stdout was not captured"))?;
        let err = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("engine stderr was not captured"))?;

        let read_stdout = async {
            let mut lines = BufReader::new(out).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_progress_from_line(&line) {
                    Some(raw) => on_progress(raw),
                    None => debug!("yt-dlp> {line}"),
                }
            }
            Ok::<_, io::Error>(())
        };
        let (stdout_result, mut tail) = tokio::join!(read_stdout, collect_stderr(err));
        stdout_result?;

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Exited {
                code: status.code(),
                message: failure_message(tail.make_contiguous()),
            })
        }
    }

    async fn probe(&self, url: &str) -> Result<VideoMetadata, EngineError> {
        let args = probe_args(url);
        debug!("Running {} {:?}", self.program.display(), args);

        let output = self
            .command(&args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            return Err(EngineError::Exited {
                code: output.status.code(),
                message: failure_message(&lines),
            });
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

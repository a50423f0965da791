//! Background job lifecycle and the event relay back to the UI thread.
//!
//! The runner is owned by the UI thread. Each job kind has a single slot;
//! a start request for an occupied slot is rejected. Jobs run on the tokio
//! runtime and talk to the UI only through [`TaskEvent`]s sent over an
//! unbounded channel, which the UI drains during its own frame.
//!
//! A job's terminal event is queued before its slot reads as free, and both
//! happen under the lock [`TaskRunner::is_busy`] takes. So the terminal event
//! of one job always precedes the `Started` of the next job of that kind.

use std::{
    future::Future,
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use log::{debug, info, warn};
use tokio::{
    runtime::Handle,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};

use crate::engine::{DownloadRequest, Engine, EngineError};
use crate::error::StartError;
use crate::model::{DownloadOptions, JobId, JobKind, PreviewInfo};
use crate::progress::{ProgressEvent, RawProgress};
use crate::thumbnail::ThumbnailFetcher;

/// Called after every relayed event so the UI wakes up and drains the queue
pub type RepaintHook = Arc<dyn Fn() + Send + Sync>;

pub type EventReceiver = UnboundedReceiver<TaskEvent>;

/// Notifications delivered to the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Started { id: JobId, kind: JobKind },
    Progress { id: JobId, progress: ProgressEvent },
    AllFinished { id: JobId },
    PreviewReady { id: JobId, info: PreviewInfo },
    Failed { id: JobId, kind: JobKind, message: String },
    Rejected { kind: JobKind, reason: StartError },
}

impl TaskEvent {
    /// Whether this event ends its job
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::AllFinished { .. }
                | TaskEvent::PreviewReady { .. }
                | TaskEvent::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunnerSettings {
    /// Transcoder handed to the engine; `None` lets it search `PATH`
    pub transcoder: Option<PathBuf>,
}

#[derive(Clone)]
struct Relay {
    tx: UnboundedSender<TaskEvent>,
    repaint: RepaintHook,
}

impl Relay {
    fn emit(&self, event: TaskEvent) {
        if self.send(event) {
            self.wake();
        }
    }

    /// Queues without waking the UI
    fn send(&self, event: TaskEvent) -> bool {
        let sent = self.tx.send(event).is_ok();
        if !sent {
            debug!("Event receiver dropped; discarding event");
        }
        sent
    }

    fn wake(&self) {
        (self.repaint)();
    }
}

/// Set once the job's terminal event is queued
type DoneFlag = Arc<Mutex<bool>>;

fn lock(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

struct JobHandle {
    id: JobId,
    done: DoneFlag,
    task: JoinHandle<()>,
}

impl JobHandle {
    fn is_active(&self) -> bool {
        !*lock(&self.done) && !self.task.is_finished()
    }
}

pub struct TaskRunner {
    runtime: Handle,
    engine: Arc<dyn Engine>,
    thumbnails: Arc<dyn ThumbnailFetcher>,
    settings: RunnerSettings,
    relay: Relay,
    next_id: AtomicU64,
    download: Option<JobHandle>,
    preview: Option<JobHandle>,
}

impl TaskRunner {
    pub fn new(
        runtime: Handle,
        engine: Arc<dyn Engine>,
        thumbnails: Arc<dyn ThumbnailFetcher>,
        settings: RunnerSettings,
        repaint: RepaintHook,
    ) -> (Self, EventReceiver) {
        let (tx, rx) = unbounded_channel();
        let runner = Self {
            runtime,
            engine,
            thumbnails,
            settings,
            relay: Relay { tx, repaint },
            next_id: AtomicU64::new(1),
            download: None,
            preview: None,
        };
        (runner, rx)
    }

    pub fn is_busy(&self, kind: JobKind) -> bool {
        self.active_job(kind).is_some()
    }

    /// Id of the job currently occupying the slot of `kind`
    pub fn active_job(&self, kind: JobKind) -> Option<JobId> {
        let slot = match kind {
            JobKind::Download => &self.download,
            JobKind::PreviewFetch => &self.preview,
        };
        slot.as_ref().filter(|h| h.is_active()).map(|h| h.id)
    }

    /// Downloads every URL in one engine run. Blank entries are ignored.
    pub fn start_download(
        &mut self,
        urls: Vec<String>,
        options: DownloadOptions,
    ) -> Result<JobId, StartError> {
        let urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            return self.reject(
                JobKind::Download,
                StartError::InvalidInput("Please enter at least one video URL"),
            );
        }
        self.ensure_idle(JobKind::Download)?;

        let request = DownloadRequest {
            urls,
            output_template: options.output_template(),
            format_selector: options.format.selector().to_owned(),
            extract_audio: options.format.extract_audio().map(str::to_owned),
            transcoder: self.settings.transcoder.clone(),
        };
        let id = self.allocate_id();
        info!(
            "Download job {id}: {} url(s), format {:?}, into {}",
            request.urls.len(),
            options.format,
            options.destination.display()
        );

        let engine = Arc::clone(&self.engine);
        let relay = self.relay.clone();
        self.launch(id, JobKind::Download, async move {
            let mut on_progress = |raw: RawProgress| {
                if let Some(progress) = ProgressEvent::from_raw(&raw) {
                    relay.emit(TaskEvent::Progress { id, progress });
                }
            };
            match engine.download(&request, &mut on_progress).await {
                Ok(()) => {
                    info!("Download job {id} finished");
                    TaskEvent::AllFinished { id }
                }
                Err(err) => {
                    warn!("Download job {id} failed: {err}");
                    TaskEvent::Failed {
                        id,
                        kind: JobKind::Download,
                        message: err.to_string(),
                    }
                }
            }
        });
        Ok(id)
    }

    /// Looks up title, duration and thumbnail for `url` without downloading
    pub fn start_preview_fetch(&mut self, url: String) -> Result<JobId, StartError> {
        let url = url.trim().to_owned();
        if url.is_empty() {
            return self.reject(
                JobKind::PreviewFetch,
                StartError::InvalidInput("Please enter a video URL to preview"),
            );
        }
        self.ensure_idle(JobKind::PreviewFetch)?;

        let id = self.allocate_id();
        info!("Preview job {id}: {url}");

        let engine = Arc::clone(&self.engine);
        let thumbnails = Arc::clone(&self.thumbnails);
        self.launch(id, JobKind::PreviewFetch, async move {
            match fetch_preview(engine.as_ref(), thumbnails, &url).await {
                Ok(info) => TaskEvent::PreviewReady { id, info },
                Err(err) => {
                    warn!("Preview job {id} failed: {err}");
                    TaskEvent::Failed {
                        id,
                        kind: JobKind::PreviewFetch,
                        message: err.to_string(),
                    }
                }
            }
        });
        Ok(id)
    }

    fn allocate_id(&self) -> JobId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn slot_mut(&mut self, kind: JobKind) -> &mut Option<JobHandle> {
        match kind {
            JobKind::Download => &mut self.download,
            JobKind::PreviewFetch => &mut self.preview,
        }
    }

    fn ensure_idle(&mut self, kind: JobKind) -> Result<(), StartError> {
        if let Some(id) = self.active_job(kind) {
            debug!("Rejecting {kind} request; job {id} still running");
            return self.reject(kind, StartError::Busy(kind));
        }
        *self.slot_mut(kind) = None;
        Ok(())
    }

    fn reject<T>(&self, kind: JobKind, reason: StartError) -> Result<T, StartError> {
        info!("Not starting {kind}: {reason}");
        self.relay.emit(TaskEvent::Rejected {
            kind,
            reason: reason.clone(),
        });
        Err(reason)
    }

    /// Runs `work` in the background and relays the event it resolves to.
    /// The slot is marked done only once that terminal event is queued.
    fn launch<F>(&mut self, id: JobId, kind: JobKind, work: F)
    where
        F: Future<Output = TaskEvent> + Send + 'static,
    {
        self.relay.emit(TaskEvent::Started { id, kind });

        let done: DoneFlag = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&done);
        let relay = self.relay.clone();
        let work = self.runtime.spawn(work);
        let task = self.runtime.spawn(async move {
            let terminal = match work.await {
                Ok(event) => event,
                Err(err) => {
                    warn!("{kind} job {id} crashed: {err}");
                    TaskEvent::Failed {
                        id,
                        kind,
                        message: format!("The {kind} job stopped unexpectedly"),
                    }
                }
            };
            let sent = {
                let mut done = lock(&flag);
                let sent = relay.send(terminal);
                *done = true;
                sent
            };
            if sent {
                relay.wake();
            }
        });

        *self.slot_mut(kind) = Some(JobHandle { id, done, task });
    }
}

async fn fetch_preview(
    engine: &dyn Engine,
    thumbnails: Arc<dyn ThumbnailFetcher>,
    url: &str,
) -> Result<PreviewInfo, EngineError> {
    let meta = engine.probe(url).await?;

    let thumbnail = match meta.thumbnail.as_deref().map(str::trim) {
        Some(thumb_url) if !thumb_url.is_empty() => {
            fetch_thumbnail(thumbnails, thumb_url.to_owned()).await
        }
        _ => None,
    };

    Ok(PreviewInfo {
        title: meta.title,
        duration_seconds: meta
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as u64),
        thumbnail,
        page_url: meta
            .webpage_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| url.to_owned()),
    })
}

/// A missing thumbnail never fails the preview.
async fn fetch_thumbnail(thumbnails: Arc<dyn ThumbnailFetcher>, url: String) -> Option<Vec<u8>> {
    let target = url.clone();
    match tokio::task::spawn_blocking(move || thumbnails.fetch(&target)).await {
        Ok(Ok(bytes)) if !bytes.is_empty() => Some(bytes),
        Ok(Ok(_)) => {
            warn!("Thumbnail {url} was empty");
            None
        }
        Ok(Err(err)) => {
            warn!("Thumbnail {url} unavailable: {err}");
            None
        }
        Err(err) => {
            warn!("Thumbnail task for {url} failed: {err}");
            None
        }
    }
}

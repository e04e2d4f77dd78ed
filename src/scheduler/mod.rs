// Bounded-concurrency batch scheduler
//
// Each batch is a FIFO queue drained by at most `concurrency` jobs. A job
// runs one link through the Downloader with a per-attempt timeout and an
// optional retry budget; every finished job frees a slot that is refilled
// immediately. Progress is streamed over a per-batch channel.

mod batch;
mod events;

pub use batch::{
    BatchOptions, BatchPolicy, DEFAULT_CONCURRENCY, DEFAULT_RETRIES, DEFAULT_TIMEOUT_MS,
    MAX_CONCURRENCY, MAX_RETRIES, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS,
};
pub use events::{BatchEvent, BatchHandle, BatchId, ProgressEmitter};

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::downloader::models::{DownloadOutcome, DownloadRequest, Link};
use crate::downloader::utils::open_folder;
use crate::downloader::{DownloadError, Downloader};
use crate::links::{detect_platform, normalize_url};
use batch::{Batch, Job};

/// Pause between a failed attempt and the next one
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

const TASK_PANICKED: &str = "download task panicked";

#[derive(Clone)]
pub struct BatchScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    downloader: Arc<Downloader>,
    output_dir: PathBuf,
    batches: Mutex<HashMap<BatchId, Arc<Batch>>>,
    next_id: AtomicU64,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, HashMap<BatchId, Arc<Batch>>> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BatchScheduler {
    pub fn new(downloader: Arc<Downloader>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                downloader,
                output_dir: output_dir.into(),
                batches: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.inner.output_dir
    }

    /// Number of batches that have not reached their terminal state
    pub fn active_batches(&self) -> usize {
        self.inner.registry().len()
    }

    /// Queue `links` and start the first jobs. Must be called from within a
    /// tokio runtime.
    ///
    /// An empty list completes on the spot: the returned handle already holds
    /// the `Done` event and nothing is registered.
    pub fn start_batch(&self, links: Vec<Link>, options: &BatchOptions) -> BatchHandle {
        let id = BatchId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let policy = BatchPolicy::from_options(options);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = BatchHandle { id, events: rx };

        let batch = Arc::new(Batch::new(
            id,
            links,
            policy,
            self.inner.output_dir.clone(),
            ProgressEmitter::new(tx),
        ));

        if batch.total == 0 {
            let mut state = batch.lock();
            batch.try_finish(&mut state);
            debug!(batch = %id, "empty batch finished immediately");
            return handle;
        }

        if let Err(e) = std::fs::create_dir_all(&batch.output_dir) {
            // The tools create missing directories themselves; only note it
            warn!(path = %batch.output_dir.display(), error = %e, "could not create output directory");
        }

        info!(
            batch = %id,
            total = batch.total,
            concurrency = policy.concurrency,
            max_retries = policy.max_retries,
            timeout_secs = policy.per_item_timeout.as_secs(),
            "starting batch"
        );

        self.inner.registry().insert(id, batch.clone());
        pump(&self.inner, &batch);
        handle
    }

    /// Stop a live batch: queued links are reported as cancelled without
    /// being dispatched and in-flight jobs are told to stop.
    ///
    /// Returns `false` for unknown or already finished batches.
    pub fn cancel_batch(&self, id: BatchId) -> bool {
        let Some(batch) = self.inner.registry().get(&id).cloned() else {
            return false;
        };

        let finished = {
            let mut state = batch.lock();
            if state.finished {
                return false;
            }
            if state.cancelled {
                return true;
            }
            state.cancelled = true;

            let drained: Vec<Link> = state.queue.drain(..).collect();
            info!(
                batch = %id,
                queued = drained.len(),
                running = state.jobs.len(),
                "cancelling batch"
            );
            for link in drained {
                let tool = self.inner.downloader.tool_for(link.platform);
                batch.record(&mut state, DownloadOutcome::cancelled(&link, tool));
            }
            for token in state.jobs.values() {
                token.cancel();
            }
            batch.try_finish(&mut state)
        };

        if finished {
            teardown(&self.inner, &batch);
        }
        true
    }
}

/// Fill free slots from the queue
fn pump(inner: &Arc<Inner>, batch: &Arc<Batch>) {
    loop {
        let job = {
            let mut state = batch.lock();
            batch.take_job(&mut state)
        };
        let Some(job) = job else { break };

        let inner = inner.clone();
        let batch = batch.clone();
        tokio::spawn(async move {
            let job_id = job.id;
            let link = job.link.clone();
            // A panicking backend still has to free its slot and count the link
            let outcome = AssertUnwindSafe(run_job(&inner.downloader, &batch, job))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(batch = %batch.id, url = %link.url, "download task panicked");
                    DownloadOutcome::failed(
                        &link.url,
                        link.platform,
                        inner.downloader.tool_for(link.platform),
                        &DownloadError::Failed(TASK_PANICKED.to_string()),
                    )
                });
            finish_job(&inner, &batch, job_id, outcome);
        });
    }
}

async fn run_job(downloader: &Downloader, batch: &Batch, job: Job) -> DownloadOutcome {
    let Job { link, cancel, .. } = job;
    let url = normalize_url(&link.url);
    let platform = match detect_platform(&url) {
        p if p.is_supported() => p,
        _ => link.platform,
    };
    let tool = downloader.tool_for(platform);
    let policy = batch.policy;

    let request = DownloadRequest {
        url: url.clone(),
        platform,
        save_mode: policy.save_mode,
        output_dir: batch.output_dir.clone(),
        timeout: policy.per_item_timeout,
    };

    let attempts = policy.max_attempts();
    let mut last_error = DownloadError::Cancelled;

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            break;
        }
        if attempt > 1 {
            debug!(batch = %batch.id, url = %url, attempt, "retrying");
        }

        match attempt_download(downloader, &request, &cancel).await {
            Ok(()) => {
                info!(batch = %batch.id, url = %url, tool = %tool, "downloaded");
                return DownloadOutcome::succeeded(&url, platform, tool);
            }
            Err(e) => last_error = e,
        }

        if attempt == attempts || cancel.is_cancelled() || last_error.is_cancelled() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(RETRY_BACKOFF) => {}
            _ = cancel.cancelled() => break,
        }
    }

    warn!(batch = %batch.id, url = %url, tool = %tool, error = %last_error, "link failed");
    DownloadOutcome::failed(&url, platform, tool, &last_error)
}

/// One attempt, bounded by the per-item timeout and the job's token even if
/// the backend ignores them. Dropping the download future kills its child.
async fn attempt_download(
    downloader: &Downloader,
    request: &DownloadRequest,
    cancel: &CancellationToken,
) -> Result<(), DownloadError> {
    tokio::select! {
        result = tokio::time::timeout(request.timeout, downloader.download(request, cancel)) => {
            result.unwrap_or(Err(DownloadError::Timeout(request.timeout)))
        }
        _ = cancel.cancelled() => Err(DownloadError::Cancelled),
    }
}

fn finish_job(inner: &Arc<Inner>, batch: &Arc<Batch>, job_id: u64, outcome: DownloadOutcome) {
    let finished = {
        let mut state = batch.lock();
        state.jobs.remove(&job_id);
        state.running = state.running.saturating_sub(1);
        batch.record(&mut state, outcome);
        batch.try_finish(&mut state)
    };

    if finished {
        teardown(inner, batch);
    } else {
        pump(inner, batch);
    }
}

/// Runs once per batch, right after `Done`
fn teardown(inner: &Inner, batch: &Batch) {
    inner.registry().remove(&batch.id);

    let cancelled = batch.lock().cancelled;
    info!(batch = %batch.id, cancelled, total = batch.total, "batch finished");

    if batch.policy.open_output_dir && !cancelled {
        open_folder(&batch.output_dir);
    }
}

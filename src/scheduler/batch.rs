// Batch policy and per-batch state

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::events::{BatchEvent, BatchId, ProgressEmitter};
use crate::downloader::models::{DownloadOutcome, Link, SaveMode};

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const MAX_CONCURRENCY: usize = 5;
pub const DEFAULT_RETRIES: u32 = 0;
pub const MAX_RETRIES: u32 = 5;
pub const DEFAULT_TIMEOUT_MS: u64 = 180_000;
pub const MIN_TIMEOUT_MS: u64 = 15_000;
pub const MAX_TIMEOUT_MS: u64 = 600_000;

/// Caller-supplied batch settings; anything missing takes its default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub save_mode: SaveMode,
    /// Reveal the output folder when the batch finishes uncancelled
    pub open_output_dir: bool,
}

impl BatchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_save_mode(mut self, save_mode: SaveMode) -> Self {
        self.save_mode = save_mode;
        self
    }

    pub fn with_open_output_dir(mut self, open: bool) -> Self {
        self.open_output_dir = open;
        self
    }
}

/// Clamped, effective settings of a running batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub concurrency: usize,
    pub max_retries: u32,
    pub per_item_timeout: Duration,
    pub save_mode: SaveMode,
    pub open_output_dir: bool,
}

impl BatchPolicy {
    pub fn from_options(options: &BatchOptions) -> Self {
        let timeout_ms = options
            .timeout_ms
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS);

        Self {
            concurrency: options
                .concurrency
                .unwrap_or(DEFAULT_CONCURRENCY)
                .clamp(1, MAX_CONCURRENCY),
            max_retries: options.max_retries.unwrap_or(DEFAULT_RETRIES).min(MAX_RETRIES),
            per_item_timeout: Duration::from_millis(timeout_ms),
            save_mode: options.save_mode,
            open_output_dir: options.open_output_dir,
        }
    }

    /// Attempts per link, first try included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// A link popped from the queue, with the token that can stop it
pub(crate) struct Job {
    pub id: u64,
    pub link: Link,
    pub cancel: CancellationToken,
}

pub(crate) struct BatchState {
    pub queue: VecDeque<Link>,
    pub running: usize,
    pub completed: usize,
    pub cancelled: bool,
    /// Set once the terminal `Done` has been emitted
    pub finished: bool,
    /// Tokens of jobs currently in flight, keyed by job id
    pub jobs: HashMap<u64, CancellationToken>,
    next_job_id: u64,
}

pub(crate) struct Batch {
    pub id: BatchId,
    pub total: usize,
    pub policy: BatchPolicy,
    pub output_dir: PathBuf,
    emitter: ProgressEmitter,
    state: Mutex<BatchState>,
}

impl Batch {
    pub fn new(
        id: BatchId,
        links: Vec<Link>,
        policy: BatchPolicy,
        output_dir: PathBuf,
        emitter: ProgressEmitter,
    ) -> Self {
        Self {
            id,
            total: links.len(),
            policy,
            output_dir,
            emitter,
            state: Mutex::new(BatchState {
                queue: links.into(),
                running: 0,
                completed: 0,
                cancelled: false,
                finished: false,
                jobs: HashMap::new(),
                next_job_id: 0,
            }),
        }
    }

    /// State lock; never held across an `.await`
    pub fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the next link if a slot is free, registering its token and
    /// announcing it while still under the lock.
    pub fn take_job(&self, state: &mut BatchState) -> Option<Job> {
        if state.cancelled || state.running >= self.policy.concurrency {
            return None;
        }
        let link = state.queue.pop_front()?;

        let id = state.next_job_id;
        state.next_job_id += 1;
        state.running += 1;

        let cancel = CancellationToken::new();
        state.jobs.insert(id, cancel.clone());

        self.emitter.emit(BatchEvent::Started {
            batch_id: self.id,
            url: link.url.clone(),
            platform: link.platform,
        });

        Some(Job { id, link, cancel })
    }

    /// Count one finished link and report it
    pub fn record(&self, state: &mut BatchState, outcome: DownloadOutcome) {
        state.completed += 1;
        self.emitter.emit(BatchEvent::Progress {
            batch_id: self.id,
            completed: state.completed,
            total: self.total,
            item: outcome,
        });
    }

    /// Emit `Done` if every link is accounted for. Returns true exactly once.
    pub fn try_finish(&self, state: &mut BatchState) -> bool {
        if state.finished || state.completed < self.total {
            return false;
        }
        state.finished = true;
        self.emitter.emit(BatchEvent::Done {
            batch_id: self.id,
            cancelled: state.cancelled,
            completed: state.completed,
            total: self.total,
            output_dir: self.output_dir.clone(),
        });
        true
    }
}

// Batch progress events

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::downloader::models::{DownloadOutcome, Platform};

/// Identifier of one `start_batch` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// Notifications for one batch, in emission order.
///
/// Per link: exactly one `Started` (unless cancelled while queued) followed
/// by exactly one `Progress`. The stream ends with a single `Done`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    Started {
        batch_id: BatchId,
        url: String,
        platform: Platform,
    },
    Progress {
        batch_id: BatchId,
        completed: usize,
        total: usize,
        item: DownloadOutcome,
    },
    Done {
        batch_id: BatchId,
        cancelled: bool,
        completed: usize,
        total: usize,
        output_dir: PathBuf,
    },
}

impl BatchEvent {
    pub fn batch_id(&self) -> BatchId {
        match self {
            Self::Started { batch_id, .. }
            | Self::Progress { batch_id, .. }
            | Self::Done { batch_id, .. } => *batch_id,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Progress emitter helper
pub struct ProgressEmitter {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl ProgressEmitter {
    pub fn new(tx: mpsc::UnboundedSender<BatchEvent>) -> Self {
        Self { tx }
    }

    /// A dropped receiver just means nobody is listening any more
    pub fn emit(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }
}

/// Caller's side of a running batch
#[derive(Debug)]
pub struct BatchHandle {
    pub id: BatchId,
    pub events: mpsc::UnboundedReceiver<BatchEvent>,
}

impl BatchHandle {
    /// Next event, or `None` once the batch is over and all events are drained
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Drain events up to and including `Done`
    pub async fn wait(mut self) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            let done = event.is_done();
            events.push(event);
            if done {
                break;
            }
        }
        events
    }
}

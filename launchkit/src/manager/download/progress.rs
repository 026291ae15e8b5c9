//! Download lifecycle events.
//!
//! Every transfer reports through the same three events:
//!
//! ```text
//! Start ──► Progress* ──► Finish
//! ```
//!
//! Exactly one `Start` precedes any `Progress`, progress is monotonically
//! non-decreasing, and exactly one `Finish` is the last event. A failed
//! transfer ends the event sequence without `Finish`; the failure is
//! reported by [`DownloadStream::finish`].

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::manager::error::{ManagerError, ManagerResult};

/// Capacity of the event channel between a transfer and its consumer.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One lifecycle event of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    /// The archive is identified and about to transfer.
    Start {
        file_name: String,
        /// Expected total bytes, 0 when unknown.
        total: u64,
    },
    /// Bytes present on disk so far.
    Progress {
        done: u64,
        total: u64,
        /// Bytes since the previous progress event.
        delta: u64,
    },
    /// Transfer and any required unpack are complete.
    Finish,
}

/// Sending half of a transfer's event channel.
///
/// Enforces the event lifecycle on the producer side: progress before
/// `start` and anything after `finish` are dropped, and progress never
/// goes backwards.
#[derive(Debug)]
pub struct EventEmitter {
    tx: mpsc::Sender<DownloadEvent>,
    started: bool,
    finished: bool,
    done: u64,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<DownloadEvent>) -> Self {
        Self {
            tx,
            started: false,
            finished: false,
            done: 0,
        }
    }

    /// Emit `Start`. `already` is the number of bytes on disk before the
    /// transfer begins (a resumed partial file).
    pub async fn start(&mut self, file_name: &str, total: u64, already: u64) {
        if self.started {
            return;
        }
        self.started = true;
        self.done = already;
        self.send(DownloadEvent::Start {
            file_name: file_name.to_string(),
            total,
        })
        .await;
    }

    /// Emit `Progress` for `done` bytes on disk.
    pub async fn progress(&mut self, done: u64, total: u64) {
        if !self.started || self.finished || done < self.done {
            return;
        }
        let delta = done - self.done;
        self.done = done;
        self.send(DownloadEvent::Progress { done, total, delta }).await;
    }

    /// Emit `Finish`.
    pub async fn finish(&mut self) {
        if !self.started || self.finished {
            return;
        }
        self.finished = true;
        self.send(DownloadEvent::Finish).await;
    }

    /// Bytes reported so far.
    pub fn done(&self) -> u64 {
        self.done
    }

    async fn send(&self, event: DownloadEvent) {
        // A consumer that stopped listening does not stop the transfer
        if self.tx.send(event).await.is_err() {
            debug!("download event receiver closed");
        }
    }
}

/// Handle to a running transfer.
///
/// Drain events with [`next_event`](Self::next_event), then collect the
/// transfer result with [`finish`](Self::finish).
#[derive(Debug)]
pub struct DownloadStream {
    events: mpsc::Receiver<DownloadEvent>,
    handle: JoinHandle<ManagerResult<u64>>,
}

impl DownloadStream {
    /// Wrap an event receiver and the task producing into it.
    ///
    /// The task resolves to the number of bytes transferred by this run.
    pub fn new(events: mpsc::Receiver<DownloadEvent>, handle: JoinHandle<ManagerResult<u64>>) -> Self {
        Self { events, handle }
    }

    /// Create a stream together with the emitter its producer should use.
    pub fn channel() -> (EventEmitter, mpsc::Receiver<DownloadEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (EventEmitter::new(tx), rx)
    }

    /// Next lifecycle event, or `None` once the transfer stopped emitting.
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events.recv().await
    }

    /// Wait for the transfer to end and return the bytes it transferred.
    pub async fn finish(self) -> ManagerResult<u64> {
        // Dropping the receiver unblocks a producer waiting on a full channel
        drop(self.events);
        self.handle.await.map_err(|e| {
            if e.is_cancelled() {
                ManagerError::Cancelled
            } else {
                ManagerError::DownloadFailed {
                    url: String::new(),
                    reason: format!("transfer task panicked: {}", e),
                }
            }
        })?
    }

    /// Abort the transfer. Bytes already written stay on disk.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

//! Single-reader ingestion loop
//!
//! One blocking worker reads lines from the transport and forwards them over
//! a single-slot channel. The worker issues the next read only after the
//! previous line has been handed over, so at most one read is in flight and a
//! slow consumer simply delays the next read. Lines arrive in exactly the
//! order the transport produced them.
//!
//! The worker never touches monitor state; it only produces raw lines.

use crate::transport::LineSource;
use crate::types::Timestamp;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default bound on how long shutdown waits for the worker
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// A raw line stamped with its receive time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub data: Vec<u8>,
    pub received: Timestamp,
}

/// Why the reader worker stopped
#[derive(Debug)]
pub enum ReaderExit {
    /// The transport reached end of stream
    EndOfStream,
    /// The consumer dropped the channel
    Closed,
    /// The transport failed
    Failed(std::io::Error),
}

/// Handle to the reader worker and the receiving end of its channel
pub struct FrameReader {
    lines: mpsc::Receiver<RawLine>,
    worker: JoinHandle<ReaderExit>,
}

impl FrameReader {
    /// Start the worker on the runtime's blocking pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: LineSource>(source: S) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let worker = tokio::task::spawn_blocking(move || read_loop(source, tx));

        Self { lines: rx, worker }
    }

    /// Next line from the transport; `None` once the worker has stopped
    pub async fn next(&mut self) -> Option<RawLine> {
        self.lines.recv().await
    }

    /// Close the channel and wait up to `grace` for the worker to stop
    ///
    /// A worker blocked in a read that never completes is left behind.
    pub async fn shutdown(self, grace: Duration) -> Option<ReaderExit> {
        let FrameReader { mut lines, worker } = self;
        lines.close();
        drop(lines);

        match tokio::time::timeout(grace, worker).await {
            Ok(Ok(exit)) => {
                log::debug!("Reader stopped: {:?}", exit);
                Some(exit)
            }
            Ok(Err(e)) => {
                log::warn!("Reader worker panicked: {}", e);
                None
            }
            Err(_) => {
                log::debug!("Reader still blocked after {:?}, detaching", grace);
                None
            }
        }
    }
}

fn read_loop<S: LineSource>(mut source: S, tx: mpsc::Sender<RawLine>) -> ReaderExit {
    loop {
        let data = match source.read_line() {
            Ok(Some(data)) => data,
            Ok(None) => {
                log::info!("Transport reached end of stream");
                return ReaderExit::EndOfStream;
            }
            Err(e) => {
                log::error!("Transport read failed: {}", e);
                return ReaderExit::Failed(e);
            }
        };

        let line = RawLine {
            data,
            received: Utc::now(),
        };

        if tx.blocking_send(line).is_err() {
            return ReaderExit::Closed;
        }
    }
}

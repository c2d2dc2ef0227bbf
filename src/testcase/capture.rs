//! Merged output capture for a child process
//!
//! stdout and stderr each get a reader task that forwards chunks into one
//! channel, in arrival order. The readers keep the pipes empty regardless
//! of how often the run log is updated, so a chatty child never blocks on
//! a full pipe buffer. Draining the channel never waits for data.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::sink::LogSink;

const READ_CHUNK: usize = 8192;

/// Combined output stream of one child process
#[derive(Debug)]
pub struct OutputCapture {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    readers: Vec<JoinHandle<()>>,
}

impl OutputCapture {
    /// Start forwarding the child's pipes
    pub fn spawn(stdout: Option<ChildStdout>, stderr: Option<ChildStderr>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            readers.push(tokio::spawn(forward(stdout, tx.clone(), "stdout")));
        }
        if let Some(stderr) = stderr {
            readers.push(tokio::spawn(forward(stderr, tx, "stderr")));
        }
        Self { rx, readers }
    }

    /// Move everything captured so far into `sink` without waiting
    ///
    /// Returns the number of bytes written.
    pub fn drain_into(&mut self, sink: Option<&mut LogSink>) -> usize {
        let mut sink = sink;
        let mut total = 0;
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => {
                    total += chunk.len();
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.write_bytes(&chunk);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if total > 0 {
            if let Some(sink) = sink {
                sink.flush();
            }
        }
        total
    }

    /// Wait up to `bound` for both pipes to reach end of stream
    ///
    /// A grandchild that inherited the pipes can hold them open forever,
    /// so readers still running after `bound` are abandoned.
    pub async fn finish(&mut self, bound: Duration) {
        let joined = tokio::time::timeout(bound, async {
            for reader in self.readers.iter_mut() {
                let _ = reader.await;
            }
        })
        .await;
        if joined.is_err() {
            tracing::debug!("Output pipes still open after child exit, abandoning readers");
            for reader in &self.readers {
                reader.abort();
            }
        }
        self.readers.clear();
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

async fn forward<R>(mut pipe: R, tx: mpsc::UnboundedSender<Vec<u8>>, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(stream, error = %e, "Failed to read child output");
                break;
            }
        }
    }
    tracing::trace!(stream, "Child output stream closed");
}

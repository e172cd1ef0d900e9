//! Push-style writes: an `AsyncWrite` front end over the create pipeline.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{duplex, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use plop_core::{Error, Result};

use crate::store::Store;

const PIPE_BUFFER: usize = 256 * 1024;

/// Accepts a stream of writes and turns them into a stored stream on
/// [`commit`](Writer::commit).
///
/// Chunking and uploading run on a background task while the caller
/// writes. Dropping the writer (or calling [`abort`](Writer::abort))
/// abandons the stream; chunks uploaded so far remain behind as
/// harmless, content-addressed orphans.
pub struct Writer {
    pipe: Option<DuplexStream>,
    task: JoinHandle<Result<String>>,
}

impl Writer {
    pub(crate) fn new(store: Store) -> Self {
        let (local, remote) = duplex(PIPE_BUFFER);
        let task = tokio::spawn(async move { store.create(remote).await });
        Self {
            pipe: Some(local),
            task,
        }
    }

    /// Finishes the stream: signals EOF, waits for the remaining chunk
    /// and extents uploads, and returns the stream's key.
    pub async fn commit(mut self) -> Result<String> {
        let mut pipe = self.pipe.take().expect("pipe taken only by commit");
        pipe.shutdown().await.map_err(Error::Io)?;
        drop(pipe);
        (&mut self.task)
            .await
            .map_err(|join| Error::Other(anyhow::anyhow!("writer task failed: {join}")))?
    }

    /// Abandons the stream and stops the background work.
    pub fn abort(self) {
        // Drop does the rest.
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl AsyncWrite for Writer {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.pipe.as_mut() {
            Some(pipe) => Pin::new(pipe).poll_write(cx, buf),
            None => Poll::Ready(Err(already_committed())),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.pipe.as_mut() {
            Some(pipe) => Pin::new(pipe).poll_flush(cx),
            None => Poll::Ready(Err(already_committed())),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.pipe.as_mut() {
            Some(pipe) => Pin::new(pipe).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

fn already_committed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "writer already committed")
}

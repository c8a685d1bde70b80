use futures::future::BoxFuture;
use std::fmt;
use std::io;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Permission bits for newly created log files (rw for owner, group, other).
pub const FILE_MODE: u32 = 0o666;

/// An open, append-only log file.
///
/// The worker owns at most one live `LogFile`; it is lent to a write or close
/// task and handed back through the completion event.
pub trait LogFile: Send {
    /// Appends one rendered line. Resolves only once the bytes left the
    /// process buffers.
    fn append<'a>(&'a mut self, line: &'a [u8]) -> BoxFuture<'a, io::Result<()>>;

    /// Closes the file. On failure the still-open file is handed back.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), CloseError>>;
}

/// Opens log files in append mode.
pub trait FileSystem: Send + Sync {
    /// Opens `path` for appending, creating it with [`FILE_MODE`] when absent.
    fn open_append<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Box<dyn LogFile>>>;
}

/// A failed close, carrying the file that could not be closed.
pub struct CloseError {
    pub file: Box<dyn LogFile>,
    pub source: io::Error,
}

impl fmt::Debug for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseError")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Real file system backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl FileSystem for TokioFileSystem {
    fn open_append<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Box<dyn LogFile>>> {
        Box::pin(async move {
            let mut options = OpenOptions::new();
            options.create(true).append(true);
            #[cfg(unix)]
            options.mode(FILE_MODE);

            let file = options.open(path).await?;
            Ok(Box::new(TokioLogFile { file }) as Box<dyn LogFile>)
        })
    }
}

#[derive(Debug)]
struct TokioLogFile {
    file: File,
}

impl LogFile for TokioLogFile {
    fn append<'a>(&'a mut self, line: &'a [u8]) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            self.file.write_all(line).await?;
            // tokio hands writes to a blocking thread; flush waits for it.
            self.file.flush().await
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), CloseError>> {
        Box::pin(async move {
            let mut this = self;
            if let Err(source) = this.file.flush().await {
                return Err(CloseError { file: this, source });
            }
            if let Err(source) = this.file.sync_all().await {
                return Err(CloseError { file: this, source });
            }
            drop(this);
            Ok(())
        })
    }
}

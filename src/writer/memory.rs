//! In-memory [`FileSystem`] with injectable failures.
//!
//! Lets hosts and tests drive the worker through open, write and close
//! failures without touching the disk.

use super::file::{CloseError, FileSystem, LogFile};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<PathBuf, Vec<u8>>,
    open_counts: HashMap<PathBuf, usize>,
    failing_opens: HashMap<PathBuf, usize>,
    failing_writes: usize,
    failing_closes: usize,
    write_latency: Option<Duration>,
    open_latency: Option<Duration>,
    open_handles: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file with existing content.
    pub fn insert(&self, path: impl Into<PathBuf>, content: &str) {
        self.state
            .lock()
            .files
            .insert(path.into(), content.as_bytes().to_vec());
    }

    /// Makes the next `count` opens of `path` fail.
    pub fn fail_next_opens(&self, path: impl Into<PathBuf>, count: usize) {
        self.state.lock().failing_opens.insert(path.into(), count);
    }

    /// Makes the next `count` appends fail, whatever the file.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().failing_writes = count;
    }

    /// Makes the next `count` closes fail.
    pub fn fail_next_closes(&self, count: usize) {
        self.state.lock().failing_closes = count;
    }

    /// Delays every append by `latency`.
    pub fn set_write_latency(&self, latency: Duration) {
        self.state.lock().write_latency = Some(latency);
    }

    /// Delays every open by `latency`.
    pub fn set_open_latency(&self, latency: Duration) {
        self.state.lock().open_latency = Some(latency);
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> String {
        self.state
            .lock()
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().files.contains_key(path.as_ref())
    }

    /// Successful opens of `path` so far.
    pub fn open_count(&self, path: impl AsRef<Path>) -> usize {
        self.state
            .lock()
            .open_counts
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    /// Handles opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles
    }
}

impl FileSystem for MemoryFileSystem {
    fn open_append<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Box<dyn LogFile>>> {
        Box::pin(async move {
            let latency = self.state.lock().open_latency;
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let mut state = self.state.lock();
            if let Some(remaining) = state.failing_opens.get_mut(path)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "injected open failure",
                ));
            }

            state.files.entry(path.to_path_buf()).or_default();
            *state.open_counts.entry(path.to_path_buf()).or_default() += 1;
            state.open_handles += 1;

            Ok(Box::new(MemoryLogFile {
                path: path.to_path_buf(),
                state: self.state.clone(),
            }) as Box<dyn LogFile>)
        })
    }
}

struct MemoryLogFile {
    path: PathBuf,
    state: Arc<Mutex<MemoryState>>,
}

impl LogFile for MemoryLogFile {
    fn append<'a>(&'a mut self, line: &'a [u8]) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let latency = self.state.lock().write_latency;
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let mut state = self.state.lock();
            if state.failing_writes > 0 {
                state.failing_writes -= 1;
                return Err(io::Error::other("injected write failure"));
            }
            state
                .files
                .entry(self.path.clone())
                .or_default()
                .extend_from_slice(line);
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), CloseError>> {
        Box::pin(async move {
            {
                let mut state = self.state.lock();
                if state.failing_closes > 0 {
                    state.failing_closes -= 1;
                    drop(state);
                    return Err(CloseError {
                        file: self,
                        source: io::Error::new(
                            io::ErrorKind::ResourceBusy,
                            "injected close failure",
                        ),
                    });
                }
                state.open_handles = state.open_handles.saturating_sub(1);
            }
            Ok(())
        })
    }
}

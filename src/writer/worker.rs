use super::diagnostics::Diagnostics;
use super::file::{CloseError, FileSystem, LogFile};
use super::queue::WriteQueue;
use super::retry::RetryPolicy;
use crate::domain::{LogEntry, SinkError};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Requests sent by `LogSink` handles to the worker.
pub(crate) enum Command {
    Enqueue(LogEntry),
    SetFile(PathBuf),
    Flush(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<QueueSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Completions of the worker's own asynchronous operations.
enum Event {
    Opened {
        generation: u64,
        path: PathBuf,
        result: io::Result<Box<dyn LogFile>>,
    },
    Written {
        file: Box<dyn LogFile>,
        result: io::Result<()>,
    },
    Closed {
        result: Result<(), CloseError>,
    },
    RetryWrite,
    RetryOpen {
        generation: u64,
        path: PathBuf,
    },
}

/// Where the single file handle currently is.
enum FileState {
    /// No handle and no open underway.
    Detached,
    /// Waiting for an open of `path`, in flight or between retries.
    Opening { path: PathBuf, generation: u64 },
    Live(Box<dyn LogFile>),
    /// The live handle is lent to the in-flight write.
    Writing,
    /// The previous handle is being closed; `next` is opened afterwards.
    Closing { next: PathBuf },
}

/// Point-in-time view of the worker, for health checks and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// Entries enqueued but not yet written.
    pub pending: usize,
    /// A write is in flight or waiting for its retry.
    pub busy: bool,
    /// Path of the live handle, if any.
    pub file: Option<PathBuf>,
    /// A close or open is underway.
    pub switching: bool,
    /// Path a pending switch or open will install.
    pub target: Option<PathBuf>,
    pub written: u64,
    pub write_failures: u64,
    pub open_failures: u64,
    pub close_failures: u64,
}

#[derive(Debug, Default)]
struct WorkerStats {
    written: u64,
    write_failures: u64,
    open_failures: u64,
    close_failures: u64,
}

/// Single owner of the queue, the cursor and the file handle.
///
/// Every mutation happens inside `run`, one message at a time. Opens, writes,
/// closes and retry timers run as separate tasks and report back through the
/// event channel, so the loop never blocks on I/O and never recurses.
pub(crate) struct Worker {
    file_system: Arc<dyn FileSystem>,
    diagnostics: Arc<dyn Diagnostics>,
    retry: RetryPolicy,
    queue: WriteQueue,
    file: FileState,
    live_path: Option<PathBuf>,
    busy: bool,
    pending_switch: Option<PathBuf>,
    open_generation: u64,
    flush_waiters: Vec<oneshot::Sender<()>>,
    shutdown: Option<oneshot::Sender<()>>,
    stats: WorkerStats,
    events: mpsc::UnboundedSender<Event>,
}

impl Worker {
    pub(crate) fn spawn(
        file_system: Arc<dyn FileSystem>,
        diagnostics: Arc<dyn Diagnostics>,
        retry: RetryPolicy,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> JoinHandle<()> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let worker = Self {
            file_system,
            diagnostics,
            retry,
            queue: WriteQueue::new(),
            file: FileState::Detached,
            live_path: None,
            busy: false,
            pending_switch: None,
            open_generation: 0,
            flush_waiters: Vec::new(),
            shutdown: None,
            stats: WorkerStats::default(),
            events: events_tx,
        };
        tokio::spawn(worker.run(commands, events_rx))
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => self.on_event(event),
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        debug!("All log sink handles dropped, draining remaining entries");
                        commands_open = false;
                    }
                },
                else => break,
            }

            self.notify_drained();

            let stopping = self.shutdown.is_some() || !commands_open;
            if stopping && (self.is_idle() || self.is_stalled()) {
                // Handles see `Closed` from here on.
                commands.close();
                self.stop().await;
                break;
            }
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Enqueue(entry) => {
                self.queue.push(entry);
                if !self.busy {
                    self.pump();
                }
            }
            Command::SetFile(path) => self.set_file(path),
            Command::Flush(reply) => self.flush_waiters.push(reply),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown(reply) => {
                debug!("Log sink shutdown requested");
                self.shutdown = Some(reply);
            }
        }
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Opened {
                generation,
                path,
                result,
            } => self.on_opened(generation, path, result),
            Event::Written { file, result } => self.on_written(file, result),
            Event::Closed { result } => self.on_closed(result),
            Event::RetryWrite => self.pump(),
            Event::RetryOpen { generation, path } => {
                if self.is_current_open(generation) {
                    self.spawn_open(generation, path);
                }
            }
        }
    }

    /// Starts the switch to `path` without dropping or repeating entries.
    fn set_file(&mut self, path: PathBuf) {
        match std::mem::replace(&mut self.file, FileState::Detached) {
            FileState::Live(file) => self.begin_close(file, path),
            FileState::Writing => {
                // The handle comes back with the write completion.
                debug!("Write in flight, deferring switch to {}", path.display());
                self.file = FileState::Writing;
                self.pending_switch = Some(path);
            }
            FileState::Closing { .. } => {
                self.file = FileState::Closing { next: path };
            }
            FileState::Opening { .. } | FileState::Detached => self.begin_open(path),
        }
    }

    /// The write loop: issues the next write if a handle is live.
    fn pump(&mut self) {
        let file = match std::mem::replace(&mut self.file, FileState::Writing) {
            FileState::Live(file) => file,
            other => {
                self.file = other;
                self.busy = false;
                return;
            }
        };

        let Some(entry) = self.queue.current() else {
            self.file = FileState::Live(file);
            self.queue.compact();
            self.busy = false;
            return;
        };

        self.busy = true;
        let line = entry.to_line().into_bytes();
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut file = file;
            let result = file.append(&line).await;
            let _ = events.send(Event::Written { file, result });
        });
    }

    fn on_written(&mut self, file: Box<dyn LogFile>, result: io::Result<()>) {
        let succeeded = match result {
            Ok(()) => {
                self.queue.advance();
                self.stats.written += 1;
                true
            }
            Err(source) => {
                self.stats.write_failures += 1;
                self.report(SinkError::WriteFailure {
                    path: self.live_path.clone().unwrap_or_default(),
                    source,
                });
                false
            }
        };

        match self.pending_switch.take() {
            Some(next) => self.begin_close(file, next),
            None => self.file = FileState::Live(file),
        }

        if succeeded {
            self.pump();
        } else {
            // Cursor stays put; the same entry is written again after the delay.
            self.schedule(self.retry.write_delay, Event::RetryWrite);
        }
    }

    fn begin_open(&mut self, path: PathBuf) {
        self.open_generation += 1;
        let generation = self.open_generation;
        self.file = FileState::Opening {
            path: path.clone(),
            generation,
        };
        self.spawn_open(generation, path);
    }

    fn spawn_open(&self, generation: u64, path: PathBuf) {
        debug!("Opening log file {}", path.display());
        let file_system = self.file_system.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = file_system.open_append(&path).await;
            let _ = events.send(Event::Opened {
                generation,
                path,
                result,
            });
        });
    }

    fn on_opened(&mut self, generation: u64, path: PathBuf, result: io::Result<Box<dyn LogFile>>) {
        if !self.is_current_open(generation) {
            // Superseded by a later set_file.
            if let Ok(file) = result {
                debug!("Discarding superseded handle for {}", path.display());
                let diagnostics = self.diagnostics.clone();
                tokio::spawn(async move {
                    if let Err(CloseError { source, .. }) = file.close().await {
                        diagnostics.report(&SinkError::CloseFailure { path, source });
                    }
                });
            }
            return;
        }

        match result {
            Ok(file) => {
                info!("Log file {} opened", path.display());
                self.file = FileState::Live(file);
                self.live_path = Some(path);
                if !self.busy {
                    self.pump();
                }
            }
            Err(source) => {
                self.stats.open_failures += 1;
                self.report(SinkError::OpenFailure {
                    path: path.clone(),
                    source,
                });
                self.schedule(
                    self.retry.open_delay,
                    Event::RetryOpen { generation, path },
                );
            }
        }
    }

    fn begin_close(&mut self, file: Box<dyn LogFile>, next: PathBuf) {
        debug!("Switching log file to {}", next.display());
        self.file = FileState::Closing { next };
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = file.close().await;
            let _ = events.send(Event::Closed { result });
        });
    }

    fn on_closed(&mut self, result: Result<(), CloseError>) {
        let next = match std::mem::replace(&mut self.file, FileState::Detached) {
            FileState::Closing { next } => next,
            other => {
                self.file = other;
                return;
            }
        };

        match result {
            Ok(()) => {
                self.live_path = None;
                self.begin_open(next);
            }
            Err(CloseError { file, source }) => {
                self.stats.close_failures += 1;
                self.report(SinkError::CloseFailure {
                    path: self.live_path.clone().unwrap_or_default(),
                    source,
                });
                warn!(
                    "Abandoning switch to {}, keeping the current log file",
                    next.display()
                );
                self.file = FileState::Live(file);
                if !self.busy {
                    self.pump();
                }
            }
        }
    }

    fn schedule(&self, delay: Duration, event: Event) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        });
    }

    fn is_current_open(&self, generation: u64) -> bool {
        matches!(self.file, FileState::Opening { generation: current, .. } if current == generation)
    }

    fn report(&self, error: SinkError) {
        if error.is_retried() {
            debug!("Log sink machinery failure, retrying: {error}");
        } else {
            warn!("Log sink machinery failure: {error}");
        }
        self.diagnostics.report(&error);
    }

    /// Everything enqueued so far has been written.
    fn is_drained(&self) -> bool {
        self.queue.is_caught_up() && !self.busy
    }

    /// Drained, and no write, close or open is outstanding.
    fn is_idle(&self) -> bool {
        self.is_drained()
            && self.pending_switch.is_none()
            && matches!(self.file, FileState::Live(_) | FileState::Detached)
    }

    /// Stopping cannot lose anything: either no handle will ever appear, or
    /// only an open is outstanding and nothing is left to write.
    fn is_stalled(&self) -> bool {
        match self.file {
            FileState::Detached => !self.busy,
            FileState::Opening { .. } => self.is_drained() && self.pending_switch.is_none(),
            _ => false,
        }
    }

    fn notify_drained(&mut self) {
        if self.is_drained() && !self.flush_waiters.is_empty() {
            for waiter in self.flush_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    async fn stop(&mut self) {
        // Leaving `Opening` retires its generation, so a late open is ignored.
        if let FileState::Live(file) = std::mem::replace(&mut self.file, FileState::Detached)
            && let Err(CloseError { source, .. }) = file.close().await
        {
            self.stats.close_failures += 1;
            self.report(SinkError::CloseFailure {
                path: self.live_path.clone().unwrap_or_default(),
                source,
            });
        }
        self.live_path = None;

        info!(
            "Log sink stopped after writing {} entries ({} pending)",
            self.stats.written,
            self.queue.pending()
        );

        for waiter in self.flush_waiters.drain(..) {
            let _ = waiter.send(());
        }
        if let Some(reply) = self.shutdown.take() {
            let _ = reply.send(());
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.queue.pending(),
            busy: self.busy,
            file: self.live_path.clone(),
            switching: matches!(
                self.file,
                FileState::Opening { .. } | FileState::Closing { .. }
            ) || self.pending_switch.is_some(),
            target: match &self.file {
                FileState::Opening { path, .. } => Some(path.clone()),
                FileState::Closing { next } => Some(next.clone()),
                _ => self.pending_switch.clone(),
            },
            written: self.stats.written,
            write_failures: self.stats.write_failures,
            open_failures: self.stats.open_failures,
            close_failures: self.stats.close_failures,
        }
    }
}

pub mod diagnostics;
pub mod file;
pub mod memory;
pub mod queue;
pub mod retry;
mod worker;

pub use diagnostics::{Diagnostics, RecordingDiagnostics, StderrDiagnostics};
pub use file::{CloseError, FILE_MODE, FileSystem, LogFile, TokioFileSystem};
pub use memory::MemoryFileSystem;
pub use queue::WriteQueue;
pub use retry::RetryPolicy;
pub use worker::QueueSnapshot;

use crate::app::Config;
use crate::domain::{EntryKind, LogEntry, Severity, SinkError};
use crate::filter::SeverityFilter;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use worker::{Command, Worker};

pub const DEFAULT_LEVEL: &str = "Error";
pub const DEFAULT_FILE: &str = "Log.txt";

/// Handle to a running log sink.
///
/// Cheap to clone; every clone feeds the same worker and shares the same
/// threshold. None of the logging entry points block or fail: the worker owns
/// all retries, and machinery failures only show up on the diagnostics
/// channel.
#[derive(Clone)]
pub struct LogSink {
    filter: SeverityFilter,
    commands: mpsc::UnboundedSender<Command>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl LogSink {
    pub fn builder() -> LogSinkBuilder {
        LogSinkBuilder::new()
    }

    /// Spawns a sink on the real file system, reporting to standard error.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(level: &str, file: impl Into<PathBuf>) -> Self {
        LogSinkBuilder::new().level(level).file(file).spawn()
    }

    pub fn from_config(config: &Config) -> Self {
        LogSinkBuilder::new()
            .level(config.level.clone())
            .file(config.file.clone())
            .retry_policy(config.retry_policy)
            .spawn()
    }

    /// Sets the threshold by name, reporting unknown names on the
    /// diagnostics channel.
    pub fn set_level(&self, name: &str) {
        if let Err(e) = self.try_set_level(name) {
            self.diagnostics.report(&e);
        }
    }

    /// Sets the threshold by name. On error the threshold is unchanged.
    pub fn try_set_level(&self, name: &str) -> Result<Severity, SinkError> {
        let threshold = self.filter.set_level(name)?;
        debug!("Log sink threshold set to {threshold}");
        Ok(threshold)
    }

    pub fn set_threshold(&self, threshold: Severity) {
        self.filter.set_threshold(threshold);
    }

    pub fn threshold(&self) -> Severity {
        self.filter.threshold()
    }

    /// Whether an entry of `kind` would currently be queued.
    pub fn accepts(&self, kind: EntryKind) -> bool {
        self.filter.accepts(kind)
    }

    /// Requests a switch to `path`; entries keep queueing meanwhile.
    pub fn set_file(&self, path: impl Into<PathBuf>) {
        self.send(Command::SetFile(path.into()));
    }

    /// Queues `message` if `kind` passes the threshold.
    ///
    /// Returns true when the entry was queued.
    pub fn log_message(&self, kind: EntryKind, message: impl Into<String>) -> bool {
        if !self.filter.accepts(kind) {
            return false;
        }
        self.send(Command::Enqueue(LogEntry::new(kind, message)))
    }

    /// Queues `message` if accepted and always echoes it to the console:
    /// standard error for `error`/`warn`, standard output otherwise.
    pub fn emit(&self, kind: EntryKind, message: &str) {
        self.log_message(kind, message);
        match kind {
            EntryKind::Error | EntryKind::Warn => eprintln!("{message}"),
            EntryKind::Info | EntryKind::Debug => println!("{message}"),
        }
    }

    pub fn error(&self, message: &str) {
        self.emit(EntryKind::Error, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(EntryKind::Warn, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(EntryKind::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(EntryKind::Debug, message);
    }

    /// Plain console output, recorded at `info`.
    pub fn log(&self, message: &str) {
        self.emit(EntryKind::Info, message);
    }

    /// Waits until every entry queued before this call is on disk.
    ///
    /// Never resolves while the log file cannot be opened; wrap it in a
    /// timeout where that matters.
    pub async fn flush(&self) -> Result<(), SinkError> {
        let (reply, done) = oneshot::channel();
        self.request(Command::Flush(reply))?;
        done.await.map_err(|_| SinkError::Closed)
    }

    pub async fn snapshot(&self) -> Result<QueueSnapshot, SinkError> {
        let (reply, snapshot) = oneshot::channel();
        self.request(Command::Snapshot(reply))?;
        snapshot.await.map_err(|_| SinkError::Closed)
    }

    /// Drains the queue, closes the log file and stops the worker.
    pub async fn shutdown(self) -> Result<(), SinkError> {
        let (reply, done) = oneshot::channel();
        self.request(Command::Shutdown(reply))?;
        done.await.map_err(|_| SinkError::Closed)
    }

    fn send(&self, command: Command) -> bool {
        match self.request(command) {
            Ok(()) => true,
            Err(e) => {
                self.diagnostics.report(&e);
                false
            }
        }
    }

    fn request(&self, command: Command) -> Result<(), SinkError> {
        self.commands.send(command).map_err(|_| SinkError::Closed)
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("threshold", &self.filter.threshold())
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}

/// Configures and spawns a [`LogSink`].
pub struct LogSinkBuilder {
    level: String,
    file: PathBuf,
    retry: RetryPolicy,
    file_system: Arc<dyn FileSystem>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl LogSinkBuilder {
    pub fn new() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            file: PathBuf::from(DEFAULT_FILE),
            retry: RetryPolicy::default(),
            file_system: Arc::new(TokioFileSystem),
            diagnostics: Arc::new(StderrDiagnostics),
        }
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn file_system(mut self, file_system: impl FileSystem + 'static) -> Self {
        self.file_system = Arc::new(file_system);
        self
    }

    pub fn diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Arc::new(diagnostics);
        self
    }

    /// Starts the worker, then applies the level and the file, in that order.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> LogSink {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Worker::spawn(
            self.file_system,
            self.diagnostics.clone(),
            self.retry,
            commands_rx,
        );

        let sink = LogSink {
            filter: SeverityFilter::default(),
            commands: commands_tx,
            diagnostics: self.diagnostics,
        };
        sink.set_level(&self.level);
        sink.set_file(self.file);
        sink
    }
}

impl Default for LogSinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::diagnostics::MockDiagnostics;
    use super::*;
    use std::time::Duration;

    fn quick_retry() -> RetryPolicy {
        RetryPolicy::uniform(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_invalid_level_reported_once() {
        let mut diagnostics = MockDiagnostics::new();
        diagnostics
            .expect_report()
            .withf(|error| matches!(error, SinkError::InvalidLevel(name) if name == "Bogus"))
            .times(1)
            .return_const(());

        let sink = LogSink::builder()
            .level("Warning")
            .file("Log.txt")
            .file_system(MemoryFileSystem::new())
            .diagnostics(diagnostics)
            .retry_policy(quick_retry())
            .spawn();

        sink.set_level("Bogus");
        assert_eq!(sink.threshold(), Severity::Warning);
    }

    #[tokio::test]
    async fn test_invalid_initial_level_keeps_default() {
        let diagnostics = RecordingDiagnostics::new();
        let sink = LogSink::builder()
            .level("Loud")
            .file_system(MemoryFileSystem::new())
            .diagnostics(diagnostics.clone())
            .spawn();

        assert_eq!(sink.threshold(), Severity::Error);
        assert_eq!(diagnostics.count("InvalidLevel"), 1);
    }

    #[tokio::test]
    async fn test_log_message_reports_filtering() {
        let fs = MemoryFileSystem::new();
        let sink = LogSink::builder()
            .level("Warning")
            .file_system(fs.clone())
            .spawn();

        assert!(sink.log_message(EntryKind::Error, "kept"));
        assert!(!sink.log_message(EntryKind::Info, "dropped"));
        sink.flush().await.unwrap();

        assert_eq!(fs.contents(DEFAULT_FILE), "[ERROR] kept\r\n");
    }

    #[tokio::test]
    async fn test_requests_after_shutdown_fail_closed() {
        let diagnostics = RecordingDiagnostics::new();
        let sink = LogSink::builder()
            .file_system(MemoryFileSystem::new())
            .diagnostics(diagnostics.clone())
            .spawn();
        let other = sink.clone();

        sink.shutdown().await.unwrap();

        assert!(matches!(other.flush().await, Err(SinkError::Closed)));
        assert!(!other.log_message(EntryKind::Error, "too late"));
        assert_eq!(diagnostics.count("Closed"), 1);
    }
}

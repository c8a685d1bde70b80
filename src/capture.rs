//! Tracing layer that feeds host log events into a [`LogSink`].

use crate::domain::EntryKind;
use crate::writer::LogSink;
use std::fmt::Write;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Target prefix of this crate's own events, which are never captured.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Captures every tracing event as a log entry.
///
/// The host's own formatting layer still prints the event; this layer only
/// adds the file copy. Events emitted by the sink itself are skipped so a
/// failing log file cannot loop back into its own queue.
#[derive(Debug, Clone)]
pub struct SinkLayer {
    sink: LogSink,
}

impl SinkLayer {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self, fallback: &str) -> String {
        let mut message = if self.message.is_empty() {
            fallback.to_string()
        } else {
            self.message
        };
        if !self.fields.is_empty() {
            message.push_str(&self.fields);
        }
        message
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            write!(self.fields, " {}={:?}", field.name(), value).ok();
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            write!(self.fields, " {}={}", field.name(), value).ok();
        }
    }
}

impl<S: Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) {
            return;
        }

        let kind = EntryKind::from(metadata.level());
        if !self.sink.accepts(kind) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.sink.log_message(kind, visitor.finish(metadata.name()));
    }
}

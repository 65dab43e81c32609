//! A `tracing-subscriber` layer recording the log lines emitted by the channel pipeline.

use spin::Mutex;
use std::{fmt, sync::Arc};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

/// A recorded log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// The level of the event.
    pub level: Level,
    /// The `target:` the event was logged with.
    pub target: String,
    /// The formatted message.
    pub message: String,
}

/// The log lines recorded by a [CollectingLayer].
#[derive(Debug, Default, Clone)]
pub struct TraceStorage(Arc<Mutex<Vec<LogLine>>>);

impl TraceStorage {
    /// Returns `true` if a line at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.0.lock().iter().any(|line| line.level == level && line.message.contains(needle))
    }

    /// Returns the messages logged at `level` under `target`.
    pub fn messages(&self, target: &str, level: Level) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|line| line.level == level && line.target == target)
            .map(|line| line.message.clone())
            .collect()
    }
}

/// Records the message of every event into a [TraceStorage].
#[derive(Debug, Default)]
pub struct CollectingLayer {
    storage: TraceStorage,
}

impl CollectingLayer {
    /// Creates a new [CollectingLayer] writing into `storage`.
    pub const fn new(storage: TraceStorage) -> Self {
        Self { storage }
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CollectingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        self.storage.0.lock().push(LogLine {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.0,
        });
    }
}

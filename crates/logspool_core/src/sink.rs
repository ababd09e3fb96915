//! The sink capability and sink combinators.

use logspool_codec::Record;
use std::sync::Arc;

/// Something that accepts log records.
///
/// Logging is fire-and-forget: sinks never return errors to the caller and
/// report failures out of band.
pub trait Sink: Send + Sync {
    /// Accepts one record.
    fn log(&self, record: Record);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn log(&self, record: Record) {
        (**self).log(record);
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn log(&self, record: Record) {
        (**self).log(record);
    }
}

/// Forwards every record to each of its sinks, in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    /// Creates an empty fanout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there are no sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for FanoutSink {
    fn log(&self, record: Record) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.log(record.clone());
            }
            last.log(record);
        }
    }
}

//! Log sink for captured diagnostics.

use tracing::debug;

/// One structured log line produced by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticLine {
    /// A new event source appeared.
    SourceCreated { source: String },
    /// An event without payload.
    Event { source: String, event: String },
    /// An HTTP request start, with its target flattened into one line.
    RequestStart {
        source: String,
        event: String,
        scheme: String,
        host: String,
        path: String,
    },
    /// One payload field of an event.
    Field {
        source: String,
        event: String,
        field: String,
        value: String,
    },
}

/// Destination for diagnostic lines. Must tolerate concurrent writers.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, line: DiagnosticLine);
}

/// Writes diagnostic lines to the `tracing` subscriber at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, line: DiagnosticLine) {
        match line {
            DiagnosticLine::SourceCreated { source } => {
                debug!(target: "healthpoll::diagnostics", %source, "new event source");
            }
            DiagnosticLine::Event { source, event } => {
                debug!(target: "healthpoll::diagnostics", %source, %event, "event");
            }
            DiagnosticLine::RequestStart {
                source,
                event,
                scheme,
                host,
                path,
            } => {
                debug!(
                    target: "healthpoll::diagnostics",
                    %source,
                    %event,
                    %scheme,
                    %host,
                    %path,
                    "event"
                );
            }
            DiagnosticLine::Field {
                source,
                event,
                field,
                value,
            } => {
                debug!(
                    target: "healthpoll::diagnostics",
                    %source,
                    %event,
                    payload_name = %field,
                    payload = %value,
                    "event"
                );
            }
        }
    }
}

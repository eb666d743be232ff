//! Bridge from the event registry to the diagnostic log.
//!
//! Every announced source is logged. Capture is enabled only on the
//! network sources; their events are flattened into [`DiagnosticLine`]s:
//!
//! - control events (id -1) are dropped
//! - events without payload become a single line
//! - `network-http-client`/`RequestStart` becomes one line carrying
//!   scheme, host and path
//! - anything else becomes one line per payload field

use std::sync::Arc;

use crate::event::{DiagnosticEvent, PayloadValue};
use crate::registry::{Capture, EventListener, EventRegistry};
use crate::sink::{DiagnosticLine, DiagnosticSink};
use crate::sources;

/// Listener that logs network diagnostics through a [`DiagnosticSink`].
pub struct DiagnosticBridge {
    sink: Arc<dyn DiagnosticSink>,
}

impl DiagnosticBridge {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// Create a bridge and subscribe it to `registry`.
    pub fn attach(registry: &EventRegistry, sink: Arc<dyn DiagnosticSink>) -> Arc<Self> {
        let bridge = Arc::new(Self::new(sink));
        registry.subscribe(bridge.clone());
        bridge
    }
}

impl EventListener for DiagnosticBridge {
    fn on_source_created(&self, source: &str) -> Capture {
        self.sink.record(DiagnosticLine::SourceCreated {
            source: source.to_string(),
        });

        if sources::is_network_source(source) {
            Capture::Enabled
        } else {
            Capture::Disabled
        }
    }

    fn on_event_written(&self, event: &DiagnosticEvent) {
        if !sources::is_network_source(&event.source) || event.is_control() {
            return;
        }

        for line in format_event(event) {
            self.sink.record(line);
        }
    }
}

/// Flatten an event into log lines.
pub fn format_event(event: &DiagnosticEvent) -> Vec<DiagnosticLine> {
    if event.payload.is_empty() {
        return vec![DiagnosticLine::Event {
            source: event.source.clone(),
            event: event.name.clone(),
        }];
    }

    if event.source == sources::HTTP_CLIENT && event.name == "RequestStart" {
        if let Some(line) = format_request_start(event) {
            return vec![line];
        }
    }

    let mut whole_payload = None;
    event
        .payload
        .iter()
        .map(|field| {
            // A non-string field renders as the JSON of the entire payload,
            // not just of that field.
            let value = match &field.value {
                PayloadValue::Str(s) => s.clone(),
                _ => whole_payload
                    .get_or_insert_with(|| serialize_payload(event))
                    .clone(),
            };
            DiagnosticLine::Field {
                source: event.source.clone(),
                event: event.name.clone(),
                field: field.name.clone(),
                value,
            }
        })
        .collect()
}

fn format_request_start(event: &DiagnosticEvent) -> Option<DiagnosticLine> {
    let scheme = event.field("scheme")?;
    let host = event.field("host")?;
    let path = event.field("pathAndQuery")?;

    Some(DiagnosticLine::RequestStart {
        source: event.source.clone(),
        event: event.name.clone(),
        scheme: scheme.to_string(),
        host: host.to_string(),
        path: path.to_string(),
    })
}

fn serialize_payload(event: &DiagnosticEvent) -> String {
    let values: Vec<&PayloadValue> = event.payload.iter().map(|f| &f.value).collect();
    serde_json::to_string(&values).unwrap_or_else(|e| format!("<unserializable payload: {e}>"))
}

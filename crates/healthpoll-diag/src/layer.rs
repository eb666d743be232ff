//! `tracing` layer that turns network-stack log output into diagnostic
//! events.
//!
//! hyper, h2, tonic, tower and rustls report their internals through
//! `tracing` (rustls through `log`, bridged by `tracing-log`). The layer
//! maps each event target to a source name, announces sources as their
//! callsites register, and converts events of network sources into
//! [`DiagnosticEvent`]s.
//!
//! The layer itself never logs. Everything is queued on an unbounded
//! channel and handed to the registry by [`forward`], outside the
//! subscriber.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::callsite::Identifier;
use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{debug, Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::event::{DiagnosticEvent, PayloadField, PayloadValue};
use crate::registry::EventRegistry;
use crate::sources;

/// Target used by `tracing-log` for records bridged from the `log` crate.
const LOG_TARGET: &str = "log";

/// What the layer observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A callsite for this source registered.
    SourceSeen(String),
    /// An event from a network source.
    Event(DiagnosticEvent),
}

/// Layer capturing network diagnostics. Create with [`diagnostics_layer`].
pub struct DiagnosticsLayer {
    notices: mpsc::UnboundedSender<Notice>,
    /// Per-callsite event ids, assigned on first use starting at 1.
    ids: Mutex<HashMap<Identifier, i32>>,
}

/// Create the layer and the receiving end of its notice queue.
pub fn diagnostics_layer() -> (DiagnosticsLayer, mpsc::UnboundedReceiver<Notice>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let layer = DiagnosticsLayer {
        notices: tx,
        ids: Mutex::new(HashMap::new()),
    };
    (layer, rx)
}

impl DiagnosticsLayer {
    fn event_id(&self, metadata: &'static Metadata<'static>) -> i32 {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        let next = ids.len() as i32 + 1;
        *ids.entry(metadata.callsite()).or_insert(next)
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticsLayer {
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        // Bridged `log` records only reveal their real target per event.
        if metadata.target() != LOG_TARGET {
            let source = source_for_target(metadata.target());
            // Lost once `forward` is gone; the layer must not log about it.
            let _ = self.notices.send(Notice::SourceSeen(source.to_string()));
        }
        // This layer has no per-layer filter, so any veto here or in
        // `enabled` would also hide the callsite from the fmt layer.
        // Everything stays on and `on_event` drops what it does not map.
        Interest::always()
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let bridged = metadata.target() == LOG_TARGET;
        if !bridged && !sources::is_network_source(source_for_target(metadata.target())) {
            return;
        }

        let mut visitor = PayloadVisitor::default();
        event.record(&mut visitor);

        let target = visitor.log_target.as_deref().unwrap_or(metadata.target());
        let source = source_for_target(target);
        if !sources::is_network_source(source) {
            return;
        }

        let name = visitor
            .log_module
            .as_deref()
            .or(metadata.module_path())
            .unwrap_or(metadata.name())
            .to_string();

        // Dropped silently after `forward` exits, as above.
        let _ = self.notices.send(Notice::Event(DiagnosticEvent {
            source: source.to_string(),
            name,
            id: self.event_id(metadata),
            payload: visitor.fields,
        }));
    }
}

/// Map an event target to the diagnostic source it belongs to.
///
/// Targets outside the network stack map to their crate name.
pub fn source_for_target(target: &str) -> &str {
    let root = target.split("::").next().unwrap_or(target);
    match root {
        "hyper_util" if target.contains("::connect::dns") => sources::NAME_RESOLUTION,
        "hyper_util" if target.contains("::connect") => sources::SOCKETS,
        "hyper" | "hyper_util" | "h2" => sources::HTTP_CLIENT,
        "mio" | "socket2" => sources::SOCKETS,
        r if r.starts_with("hickory_") || r.starts_with("trust_dns_") => sources::NAME_RESOLUTION,
        "tonic" | "tower" => sources::GRPC_CLIENT,
        "rustls" | "tokio_rustls" => sources::SECURITY,
        _ => root,
    }
}

/// Drain layer notices into the registry until the layer is dropped.
pub async fn forward(mut notices: mpsc::UnboundedReceiver<Notice>, registry: EventRegistry) {
    while let Some(notice) = notices.recv().await {
        match notice {
            Notice::SourceSeen(name) => {
                registry.source(&name);
            }
            Notice::Event(event) => {
                registry.source(&event.source);
                registry.dispatch(&event);
            }
        }
    }
    debug!("diagnostic notice queue closed");
}

#[derive(Default)]
struct PayloadVisitor {
    fields: Vec<PayloadField>,
    log_target: Option<String>,
    log_module: Option<String>,
}

impl PayloadVisitor {
    fn push(&mut self, field: &Field, value: PayloadValue) {
        match (field.name(), value) {
            ("log.target", PayloadValue::Str(s)) => self.log_target = Some(s),
            ("log.module_path", PayloadValue::Str(s)) => self.log_module = Some(s),
            (name, _) if name.starts_with("log.") => {}
            (name, value) => self.fields.push(PayloadField {
                name: name.to_string(),
                value,
            }),
        }
    }
}

impl Visit for PayloadVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, PayloadValue::Str(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, PayloadValue::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, PayloadValue::UInt(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, PayloadValue::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, PayloadValue::Bool(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, PayloadValue::Str(format!("{value:?}")));
    }
}

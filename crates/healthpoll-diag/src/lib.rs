//! healthpoll-diag — network diagnostic capture for healthpoll.
//!
//! Collects low-level events from the network stack (HTTP/2 frames,
//! socket connects, DNS lookups, TLS handshakes, gRPC calls) and routes
//! the interesting ones into the structured log next to the health-check
//! output.
//!
//! # Architecture
//!
//! ```text
//! DiagnosticsLayer (tracing)  ──notices──▶ forward() ─┐
//! RequestDiagnostics (tower)  ───────────────────────┤
//!                                                     ▼
//!                                              EventRegistry
//!                                                     │ on_source_created / on_event_written
//!                                                     ▼
//!                                            DiagnosticBridge
//!                                                     │ DiagnosticLine
//!                                                     ▼
//!                                          DiagnosticSink (TracingSink)
//! ```
//!
//! Sources are announced to every subscriber as they appear. The bridge
//! only enables capture on the five network sources in [`sources`].

pub mod bridge;
pub mod event;
pub mod http;
pub mod layer;
pub mod registry;
pub mod sink;

pub use bridge::DiagnosticBridge;
pub use event::{DiagnosticEvent, PayloadField, PayloadValue, CONTROL_EVENT_ID};
pub use http::{RequestDiagnostics, RequestDiagnosticsLayer};
pub use layer::{diagnostics_layer, forward, DiagnosticsLayer, Notice};
pub use registry::{Capture, EventListener, EventRegistry, EventSource};
pub use sink::{DiagnosticLine, DiagnosticSink, TracingSink};

/// Names of the network diagnostic sources.
pub mod sources {
    /// HTTP client requests and the HTTP/1 and HTTP/2 connection machinery.
    pub const HTTP_CLIENT: &str = "network-http-client";
    /// TCP connect/accept lifecycle.
    pub const SOCKETS: &str = "network-sockets";
    /// Host name lookups.
    pub const NAME_RESOLUTION: &str = "name-resolution";
    /// gRPC client calls.
    pub const GRPC_CLIENT: &str = "grpc-client";
    /// TLS handshakes and certificate validation.
    pub const SECURITY: &str = "network-security";

    /// Every network source, in no particular order.
    pub const ALL: [&str; 5] = [HTTP_CLIENT, SOCKETS, NAME_RESOLUTION, GRPC_CLIENT, SECURITY];

    /// Whether `name` is exactly one of the network sources.
    pub fn is_network_source(name: &str) -> bool {
        ALL.contains(&name)
    }
}

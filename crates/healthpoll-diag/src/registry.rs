//! Process-wide registry of diagnostic event sources.
//!
//! Sources are created by name and announced to every subscribed
//! listener, including listeners that subscribe after the source was
//! created. Each listener decides per source whether it wants that
//! source's events.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::event::{DiagnosticEvent, PayloadField, CONTROL_EVENT_ID};

/// Whether a listener wants events from a newly announced source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Enabled,
    Disabled,
}

/// Observer for the event registry.
///
/// Callbacks may run on any thread and are never invoked while the
/// registry lock is held.
pub trait EventListener: Send + Sync {
    /// A source exists. Called once per source per listener.
    fn on_source_created(&self, source: &str) -> Capture;

    /// An event from a source this listener enabled.
    fn on_event_written(&self, event: &DiagnosticEvent);
}

struct Subscription {
    listener: Arc<dyn EventListener>,
    /// Sources this listener enabled capture on.
    enabled: HashSet<String>,
}

#[derive(Default)]
struct Inner {
    /// Known sources, in creation order.
    sources: Vec<String>,
    subscriptions: Vec<Subscription>,
}

/// Registry of diagnostic sources and their listeners.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a handle to the named source, announcing it if it is new.
    pub fn source(&self, name: &str) -> EventSource {
        let listeners = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            if inner.sources.iter().any(|s| s == name) {
                Vec::new()
            } else {
                inner.sources.push(name.to_string());
                inner
                    .subscriptions
                    .iter()
                    .enumerate()
                    .map(|(index, sub)| (index, sub.listener.clone()))
                    .collect()
            }
        };

        for (index, listener) in listeners {
            self.announce(index, listener.as_ref(), name);
        }

        EventSource {
            name: Arc::from(name),
            registry: self.clone(),
        }
    }

    /// Subscribe a listener. Existing sources are announced immediately;
    /// later ones as they are created.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        let (index, existing) = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            inner.subscriptions.push(Subscription {
                listener: listener.clone(),
                enabled: HashSet::new(),
            });
            (inner.subscriptions.len() - 1, inner.sources.clone())
        };

        for name in existing {
            self.announce(index, listener.as_ref(), &name);
        }
    }

    /// Names of all sources created so far, in creation order.
    pub fn sources(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.sources.clone()
    }

    /// Whether any listener captures the named source.
    pub fn is_captured(&self, source: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.subscriptions.iter().any(|s| s.enabled.contains(source))
    }

    fn announce(&self, index: usize, listener: &dyn EventListener, name: &str) {
        if listener.on_source_created(name) == Capture::Disabled {
            return;
        }

        {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(sub) = inner.subscriptions.get_mut(index) {
                sub.enabled.insert(name.to_string());
            }
        }
        trace!(source = %name, "capture enabled");

        let notice = DiagnosticEvent {
            source: name.to_string(),
            name: "CaptureEnabled".to_string(),
            id: CONTROL_EVENT_ID,
            payload: Vec::new(),
        };
        listener.on_event_written(&notice);
    }

    /// Deliver an event to every listener that enabled its source.
    pub fn dispatch(&self, event: &DiagnosticEvent) {
        let listeners: Vec<Arc<dyn EventListener>> = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            inner
                .subscriptions
                .iter()
                .filter(|s| s.enabled.contains(&event.source))
                .map(|s| s.listener.clone())
                .collect()
        };

        for listener in listeners {
            listener.on_event_written(event);
        }
    }
}

/// Handle for writing events under one source name.
#[derive(Clone)]
pub struct EventSource {
    name: Arc<str>,
    registry: EventRegistry,
}

impl EventSource {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether anyone is listening; lets producers skip building payloads.
    pub fn is_enabled(&self) -> bool {
        self.registry.is_captured(&self.name)
    }

    /// Write an event to all listeners capturing this source.
    pub fn write(&self, event: &str, id: i32, payload: Vec<PayloadField>) {
        self.registry.dispatch(&DiagnosticEvent {
            source: self.name.to_string(),
            name: event.to_string(),
            id,
            payload,
        });
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource").field("name", &self.name).finish()
    }
}

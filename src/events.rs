//! Render events and the sinks that observe them

use std::fmt;
use std::sync::Mutex;

use tracing::{debug, warn};

/// Lifecycle stage reported by an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Sent,
    Error,
    Received,
    Complete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Started => "started",
            EventKind::Sent => "sent",
            EventKind::Error => "error",
            EventKind::Received => "received",
            EventKind::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderEvent {
    pub kind: EventKind,
    /// Tag (or kind name) of the element that raised the event
    pub tag: String,
    pub detail: String,
}

impl RenderEvent {
    pub fn new(kind: EventKind, tag: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            tag: tag.into(),
            detail: detail.into(),
        }
    }
}

/// Receives events bubbled up from subscribed elements
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RenderEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RenderEvent) {
        match event.kind {
            EventKind::Error => warn!(tag = %event.tag, detail = %event.detail, "render error"),
            kind => debug!(tag = %event.tag, detail = %event.detail, %kind, "render event"),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<RenderEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events of one kind
    pub fn of_kind(&self, kind: EventKind) -> Vec<RenderEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &RenderEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn emit(&self, event: &RenderEvent) {
        (**self).emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_filters_by_kind() {
        let sink = CollectingSink::new();
        sink.emit(&RenderEvent::new(EventKind::Sent, "expr", "upper"));
        sink.emit(&RenderEvent::new(EventKind::Error, "expr", "boom"));
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.of_kind(EventKind::Error)[0].detail, "boom");
    }
}

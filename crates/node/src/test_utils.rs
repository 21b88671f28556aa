//! test utilities for verifying log output.

use std::sync::{Arc, Mutex};
use tracing::{
    field::{Field, Visit},
    subscriber::set_default,
    Event, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer,
};

/// a recorded event with its target and captured fields.
#[derive(Debug, Clone)]
pub(crate) struct EventRecord {
    pub(crate) target: String,
    pub(crate) fields: Vec<(String, String)>,
}

impl EventRecord {
    pub(crate) fn message(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == "message")
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// collects field values from an event.
struct FieldCollector {
    fields: Vec<(String, String)>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .push((field.name().to_string(), format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }
}

/// a tracing layer that records events for test assertions.
#[derive(Debug, Clone)]
pub(crate) struct EventCollector {
    events: Arc<Mutex<Vec<EventRecord>>>,
}

impl EventCollector {
    pub(crate) fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// finds every event with the given message under `target`.
    pub(crate) fn find(&self, target: &str, message: &str) -> Vec<EventRecord> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.target == target && e.message() == Some(message))
            .cloned()
            .collect()
    }

    /// installs this collector as the default subscriber for the current thread,
    /// returning a guard that restores the previous subscriber on drop.
    pub(crate) fn as_default(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        set_default(subscriber)
    }
}

impl<S: Subscriber> Layer<S> for EventCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut collector = FieldCollector { fields: Vec::new() };
        event.record(&mut collector);

        self.events.lock().unwrap().push(EventRecord {
            target: event.metadata().target().to_string(),
            fields: collector.fields,
        });
    }
}

//! Custom tracing layer for streaming generation events to the REPL
//!
//! Captures events emitted by the makeover crates and forwards them to the
//! presentation layer via a tokio channel.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Events from targets outside this prefix are not forwarded.
pub const EVENT_TARGET_PREFIX: &str = "makeover";

/// Event data sent to the presentation layer
#[derive(Debug, Clone, serde::Serialize)]
pub struct GenerationEvent {
    /// Event target (e.g., "makeover_core::orchestrator")
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    /// Human-readable message
    pub message: String,
    /// Structured fields from the event
    pub fields: HashMap<String, Value>,
    /// Fields of the enclosing spans (e.g., request_id, kind)
    pub span: HashMap<String, Value>,
    /// Timestamp
    pub timestamp: String,
}

/// Span fields stored in the span's extensions.
#[derive(Debug, Default, Clone)]
struct SpanFields(HashMap<String, Value>);

/// A tracing layer that sends makeover events to a channel
pub struct GenerationEventLayer {
    sender: mpsc::UnboundedSender<GenerationEvent>,
}

impl GenerationEventLayer {
    /// Create a new layer with the given channel sender
    pub fn new(sender: mpsc::UnboundedSender<GenerationEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for GenerationEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if !attrs.metadata().target().starts_with(EVENT_TARGET_PREFIX) {
            return;
        }
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(EVENT_TARGET_PREFIX) {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        // Outermost span first so inner fields win
        let mut span_fields = HashMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(stored) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(stored.0.clone());
                }
            }
        }

        let message = fields
            .remove("message")
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();

        let generation_event = GenerationEvent {
            target: metadata.target().to_string(),
            level: metadata.level().to_string(),
            message,
            fields,
            span: span_fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Non-blocking send - if the receiver is dropped, we just skip
        let _ = self.sender.send(generation_event);
    }
}

/// Field visitor that extracts tracing event fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}

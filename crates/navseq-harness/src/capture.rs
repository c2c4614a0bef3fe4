#![forbid(unsafe_code)]

//! Tracing capture for log assertions.
//!
//! ```rust,ignore
//! let (result, logs) = capture(|| serializer.request_pop(true));
//! assert!(logs.contains("navseq.serializer", "structural no-op"));
//! ```
//!
//! Capture is installed as the thread-local default subscriber, so only
//! events emitted on the calling thread are seen.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

/// One captured event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
    /// Innermost span the event was emitted in.
    pub span: Option<String>,
}

/// Shared buffer of captured events.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer feeding this buffer.
    #[must_use]
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer {
            events: Arc::clone(&self.events),
        }
    }

    /// Everything captured so far.
    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events whose target starts with `prefix`.
    #[must_use]
    pub fn with_target(&self, prefix: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.target.starts_with(prefix))
            .collect()
    }

    /// Whether an event with exactly `target` and `message` was captured.
    #[must_use]
    pub fn contains(&self, target: &str, message: &str) -> bool {
        self.events()
            .iter()
            .any(|event| event.target == target && event.message == message)
    }

    /// Number of events with exactly `target` and `message`.
    #[must_use]
    pub fn count(&self, target: &str, message: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.target == target && event.message == message)
            .count()
    }
}

/// Run `f` with a capturing subscriber installed on this thread.
pub fn capture<F, R>(f: F) -> (R, LogCapture)
where
    F: FnOnce() -> R,
{
    let logs = LogCapture::new();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(logs.layer());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs)
}

/// Layer that records events into a [`LogCapture`].
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for CaptureLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();

        let span = ctx
            .event_span(event)
            .map(|span_ref| span_ref.name().to_string());

        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedEvent {
                level: *event.metadata().level(),
                target: event.metadata().target().to_string(),
                message,
                fields,
                span,
            });
    }
}

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

/// Receiver of non-fatal warnings raised by a list
pub trait DiagnosticSink: Send + Sync {
    /// Report a warning raised by `component`
    fn warn(&self, component: &str, message: &str);
}

/// Sink forwarding to the `log` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn warn(&self, component: &str, message: &str) {
        log::warn!("[{}] {}", component, message);
    }
}

/// Sink that keeps every message, for inspection in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Messages received so far, as `[component] message`
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn warn(&self, component: &str, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("[{}] {}", component, message));
    }
}

/// Per-list warning state: each distinct message reaches the sink once
/// for the lifetime of the list.
pub struct Diagnostics {
    component: String,
    sink: Arc<dyn DiagnosticSink>,
    seen: Mutex<HashSet<u64>>,
}

impl Diagnostics {
    /// Diagnostics for `component` reporting to `sink`
    pub fn new(component: impl Into<String>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            component: component.into(),
            sink,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Diagnostics reporting through `log`
    pub fn logging(component: impl Into<String>) -> Self {
        Self::new(component, Arc::new(LogSink))
    }

    /// Emit `message` unless an identical one was already emitted.
    /// Returns whether it was emitted.
    pub fn warn_once(&self, message: &str) -> bool {
        let mut hasher = DefaultHasher::new();
        message.hash(&mut hasher);
        let fresh = self
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hasher.finish());
        if fresh {
            self.sink.warn(&self.component, message);
        }
        fresh
    }

    /// Sink shared with lists created on top of this one
    pub fn sink(&self) -> Arc<dyn DiagnosticSink> {
        Arc::clone(&self.sink)
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

//! Call-site log
//!
//! Entries are formatted labels such as `"Element.innerHTML"` or
//! `"new CustomEvent(string)"`, appended in access order. Storage sits behind
//! the [`LogSink`] trait; [`TraceLog`] normalises every label before it
//! reaches the sink.

use std::cell::RefCell;
use std::fmt;

/// Ordered storage for log entries
pub trait LogSink {
    /// Append one entry
    fn append(&mut self, entry: String);

    /// Remove every entry
    fn clear(&mut self);

    /// Snapshot of all entries in insertion order
    fn entries(&self) -> Vec<String>;

    /// Number of entries
    fn len(&self) -> usize;

    /// Check if the sink holds no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory sink
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Vec<String>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for MemorySink {
    fn append(&mut self, entry: String) {
        self.entries.push(entry);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn entries(&self) -> Vec<String> {
        self.entries.clone()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Label rewrite applied before storage
pub type Normalizer = Box<dyn Fn(&str) -> String>;

/// Normaliser that replaces every `marker` with `"."`
pub fn strip_marker(marker: &str) -> Normalizer {
    let marker = marker.to_string();
    Box::new(move |label: &str| {
        if marker.is_empty() {
            label.to_string()
        } else {
            label.replace(&marker, ".")
        }
    })
}

/// The session's log: a sink plus the label normaliser
pub struct TraceLog {
    sink: RefCell<Box<dyn LogSink>>,
    normalize: Normalizer,
}

impl TraceLog {
    /// Create a log over `sink`
    pub fn new(sink: Box<dyn LogSink>, normalize: Normalizer) -> Self {
        Self {
            sink: RefCell::new(sink),
            normalize,
        }
    }

    /// In-memory log stripping `"Prototype."`
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySink::new()), strip_marker("Prototype."))
    }

    /// Normalise and append a label
    pub fn record(&self, label: &str) {
        let entry = (self.normalize)(label);
        tracing::trace!(entry = %entry, "call site");
        self.sink.borrow_mut().append(entry);
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<String> {
        self.sink.borrow().entries()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.sink.borrow_mut().clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.sink.borrow().len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.sink.borrow().is_empty()
    }
}

impl fmt::Debug for TraceLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceLog")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

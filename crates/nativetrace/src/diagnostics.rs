//! Coverage-gap and foreign-realm reports
//!
//! Nothing here is an error for the instrumented code. Each report is kept
//! on the session for inspection and emitted as a `tracing` warning.

use nativetrace_host::ObjectId;
use std::cell::RefCell;
use std::fmt;

/// Kind of report
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// An object from another realm reached the tracer and was passed through
    ForeignRealm,
    /// Own read-only, non-configurable data property holding a native object
    ReadonlyProperty,
    /// Writable data property whose value could not be replaced by its wrapper
    UnwrappedProperty,
    /// Descriptor shape the shimmer has no strategy for
    UnrecognizedProperty,
    /// Shimming a property failed outright
    ShimFailed,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ForeignRealm => "foreign-realm",
            DiagnosticKind::ReadonlyProperty => "readonly-property",
            DiagnosticKind::UnwrappedProperty => "unwrapped-property",
            DiagnosticKind::UnrecognizedProperty => "unrecognized-property",
            DiagnosticKind::ShimFailed => "shim-failed",
        };
        f.write_str(name)
    }
}

/// One report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What went wrong
    pub kind: DiagnosticKind,
    /// Object concerned
    pub object: ObjectId,
    /// Diagnostic name of the object, when known
    pub name: Option<String>,
    /// Property concerned
    pub key: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(name) = &self.name {
            write!(f, " ({}", name)?;
            if let Some(key) = &self.key {
                write!(f, ".{}", key)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Collected reports
#[derive(Debug, Default)]
pub struct Diagnostics {
    reports: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a report and emit it as a warning
    pub fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = %diagnostic.kind,
            object = %diagnostic.object,
            name = ?diagnostic.name,
            key = ?diagnostic.key,
            "{}",
            diagnostic.message
        );
        self.reports.borrow_mut().push(diagnostic);
    }

    /// Snapshot of all reports
    pub fn all(&self) -> Vec<Diagnostic> {
        self.reports.borrow().clone()
    }

    /// Reports of one kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.reports
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of reports
    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    /// Check if nothing was reported
    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nativetrace_host::Host;

    fn report(object: ObjectId, kind: DiagnosticKind) -> Diagnostic {
        Diagnostic {
            kind,
            object,
            name: Some("document".to_string()),
            key: Some("location".to_string()),
            message: "Unable to wrap readonly property".to_string(),
        }
    }

    #[test]
    fn test_report_and_filter() {
        let host = Host::new();
        let object = host.create_plain_object(host.main_realm());
        let diagnostics = Diagnostics::new();
        diagnostics.report(report(object, DiagnosticKind::ReadonlyProperty));
        diagnostics.report(report(object, DiagnosticKind::ForeignRealm));

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::ForeignRealm).len(), 1);
        assert!(diagnostics.of_kind(DiagnosticKind::ShimFailed).is_empty());
    }

    #[test]
    fn test_display() {
        let host = Host::new();
        let object = host.create_plain_object(host.main_realm());
        let text = report(object, DiagnosticKind::ReadonlyProperty).to_string();
        assert_eq!(
            text,
            "[readonly-property] Unable to wrap readonly property (document.location)"
        );
    }
}

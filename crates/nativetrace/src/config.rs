//! Session configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration:
//!
//! ```json
//! {
//!   "never_wrap": ["Math"],
//!   "never_shim": ["navigator.plugins"],
//!   "prototype_marker": "Prototype.",
//!   "export_name": "log",
//!   "exclude_array_families": true,
//!   "trace_ancestors": true
//! }
//! ```

use crate::error::TraceResult;
use serde::{Deserialize, Serialize};

/// Trace session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Extra dotted global paths that must never be proxied
    pub never_wrap: Vec<String>,

    /// Extra dotted global paths whose properties must never be shimmed
    pub never_shim: Vec<String>,

    /// Marker stripped from every log label (`"Prototype."` becomes `"."`)
    pub prototype_marker: String,

    /// Global name the log object is exported under; `None` keeps it private
    pub export_name: Option<String>,

    /// Exclude every global whose name contains `Array`, and its prototype
    pub exclude_array_families: bool,

    /// Shim `parent` and `top` when they differ from the global
    pub trace_ancestors: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            never_wrap: Vec::new(),
            never_shim: Vec::new(),
            prototype_marker: "Prototype.".to_string(),
            export_name: Some("log".to_string()),
            exclude_array_families: true,
            trace_ancestors: true,
        }
    }
}

impl TraceConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> TraceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the exported log name
    pub fn with_export_name(mut self, name: Option<&str>) -> Self {
        self.export_name = name.map(str::to_string);
        self
    }

    /// Add a path that must never be proxied
    pub fn never_wrap(mut self, path: impl Into<String>) -> Self {
        self.never_wrap.push(path.into());
        self
    }

    /// Add a path whose properties must never be shimmed
    pub fn never_shim(mut self, path: impl Into<String>) -> Self {
        self.never_shim.push(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = TraceConfig::from_json("{}").unwrap();
        assert_eq!(config, TraceConfig::default());
        assert_eq!(config.prototype_marker, "Prototype.");
        assert_eq!(config.export_name.as_deref(), Some("log"));
    }

    #[test]
    fn test_partial_json() {
        let config = TraceConfig::from_json(
            r#"{ "never_wrap": ["Math"], "export_name": null, "trace_ancestors": false }"#,
        )
        .unwrap();
        assert_eq!(config.never_wrap, vec!["Math"]);
        assert!(config.export_name.is_none());
        assert!(!config.trace_ancestors);
        assert!(config.exclude_array_families);
    }

    #[test]
    fn test_bad_json() {
        assert!(TraceConfig::from_json("{ never_wrap: 1 }").is_err());
        assert!(TraceConfig::from_json(r#"{ "never_wrap": 1 }"#).is_err());
    }

    #[test]
    fn test_builders() {
        let config = TraceConfig::default()
            .with_export_name(Some("calls"))
            .never_wrap("Math")
            .never_shim("navigator");
        assert_eq!(config.export_name.as_deref(), Some("calls"));
        assert_eq!(config.never_wrap, vec!["Math"]);
        assert_eq!(config.never_shim, vec!["navigator"]);
    }
}

//! Non-fatal parse diagnostics.
//!
//! Element-level problems (a link without `href`, a collection without
//! links, ...) are skipped and reported to an optional [`WarningLogger`].
//! APIs that take no logger discard them.

use std::fmt;

use serde_json::Value;

/// How much a skipped element degrades the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Cosmetic, the element was recovered or ignored.
    Minor,
    /// Some content was dropped.
    Moderate,
    /// A significant part of the publication is unusable.
    Major,
}

/// A diagnostic emitted while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub severity: Severity,
    /// Name of the model type being parsed (e.g. `"Link"`).
    pub model: &'static str,
    pub message: String,
    /// The offending JSON fragment, when there is one.
    pub source: Option<Value>,
}

impl Warning {
    pub fn new(severity: Severity, model: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            model,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: &Value) -> Self {
        self.source = Some(source.clone());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.severity, self.model, self.message)
    }
}

/// Append-only sink for [`Warning`]s.
pub trait WarningLogger {
    fn log(&mut self, warning: Warning);
}

/// Collects warnings in memory.
#[derive(Debug, Clone, Default)]
pub struct ListWarningLogger {
    pub warnings: Vec<Warning>,
}

impl ListWarningLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WarningLogger for ListWarningLogger {
    fn log(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }
}

/// Forwards warnings to `tracing` at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWarningLogger;

impl WarningLogger for TracingWarningLogger {
    fn log(&mut self, warning: Warning) {
        tracing::warn!(
            severity = ?warning.severity,
            model = warning.model,
            "{}",
            warning.message
        );
    }
}

/// Drops every warning.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DiscardWarnings;

impl WarningLogger for DiscardWarnings {
    fn log(&mut self, _warning: Warning) {}
}

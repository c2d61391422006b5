//! Severity-leveled diagnostics shared by both parsers.
//!
//! Parsers never abort on malformed sections or fields; they extract what
//! they can and record a diagnostic. Only a document that yields nothing at
//! all is surfaced as a hard error by the parser itself.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Where in the source document a diagnostic was raised.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Section name (EDS) or element path (IODD).
    pub section: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl SourceLocation {
    pub fn section(name: impl Into<String>) -> Self {
        SourceLocation {
            section: name.into(),
            line: None,
            column: None,
        }
    }

    pub fn line(name: impl Into<String>, line: u32) -> Self {
        SourceLocation {
            section: name.into(),
            line: Some(line),
            column: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
    /// Offending source fragment, when one exists.
    pub context: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.severity, self.code)?;
        if !self.location.section.is_empty() {
            write!(f, " {}", self.location.section)?;
            if let Some(line) = self.location.line {
                write!(f, ":{line}")?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

/// Accumulates diagnostics across a parse run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn add(
        &mut self,
        code: impl Into<String>,
        severity: Severity,
        location: SourceLocation,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            code: code.into(),
            severity,
            message: message.into(),
            location,
            context: None,
        });
    }

    pub fn info(&mut self, code: &str, location: SourceLocation, message: impl Into<String>) {
        self.add(code, Severity::Info, location, message);
    }

    pub fn warning(&mut self, code: &str, location: SourceLocation, message: impl Into<String>) {
        self.add(code, Severity::Warning, location, message);
    }

    pub fn error(&mut self, code: &str, location: SourceLocation, message: impl Into<String>) {
        self.add(code, Severity::Error, location, message);
    }

    pub fn fatal(&mut self, code: &str, location: SourceLocation, message: impl Into<String>) {
        self.add(code, Severity::Fatal, location, message);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Warning)
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Merge another collector's diagnostics into this one.
    pub fn extend(&mut self, other: DiagnosticCollector) {
        self.diagnostics.extend(other.diagnostics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn collector_flags() {
        let mut c = DiagnosticCollector::new();
        assert!(!c.has_warnings());

        c.warning("W001", SourceLocation::section("Params"), "missing name");
        assert!(c.has_warnings());
        assert!(!c.has_errors());

        c.error("E001", SourceLocation::section("Device"), "missing VendCode");
        assert!(c.has_errors());
        assert_eq!(c.max_severity(), Some(Severity::Error));
        assert_eq!(c.count(Severity::Warning), 1);
    }

    #[test]
    fn display_includes_location() {
        let mut c = DiagnosticCollector::new();
        c.error("E002", SourceLocation::line("Capacity", 12), "bad value");
        let text = c.iter().next().unwrap().to_string();
        assert!(text.contains("Capacity:12"));
        assert!(text.contains("E002"));
    }
}

//! Diagnostics collected over one compile.

use std::fmt;

use crate::SourceLoc;

/// Severity of a diagnostic. Any `Error` fails the compile; warnings are
/// surfaced but do not prevent emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// The kind of a diagnostic, mirroring the compile error taxonomy plus
/// the non-fatal findings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagKind {
    UnsupportedConstruct,
    TypeNotRepresentable,
    StageSplitConflict,
    StageOrderConflict,
    BadInterpolate,
    UnknownIdentifier,
    InternalInvariantViolated,
    // Warning-only kinds.
    DeadCode,
    UnusedAttribute,
    UnusedInterpolate,
}

impl fmt::Display for DiagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnsupportedConstruct => "unsupported-construct",
            Self::TypeNotRepresentable => "type-not-representable",
            Self::StageSplitConflict => "stage-split-conflict",
            Self::StageOrderConflict => "stage-order-conflict",
            Self::BadInterpolate => "bad-interpolate",
            Self::UnknownIdentifier => "unknown-identifier",
            Self::InternalInvariantViolated => "internal-invariant-violated",
            Self::DeadCode => "dead-code",
            Self::UnusedAttribute => "unused-attribute",
            Self::UnusedInterpolate => "unused-interpolate",
        })
    }
}

/// A single diagnostic record.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagKind,
    pub message: String,
    pub loc: Option<SourceLoc>,
}

impl Diagnostic {
    pub fn warning(kind: DiagKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            loc: None,
        }
    }

    pub fn error(kind: DiagKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
            loc: None,
        }
    }

    pub fn with_loc(mut self, loc: Option<SourceLoc>) -> Self {
        self.loc = loc;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{severity}[{}]: {}", self.kind, self.message)?;
        if let Some(loc) = self.loc {
            write!(f, " at {}:{}", loc.line, loc.column)?;
        }
        Ok(())
    }
}

/// An ordered collection of diagnostics owned by one compile invocation.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.records.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    /// Consumes the collection, returning the records in insertion order.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detection() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());
        diags.push(Diagnostic::warning(DiagKind::DeadCode, "statement 3 is dead"));
        assert!(!diags.has_errors());
        diags.push(Diagnostic::error(
            DiagKind::BadInterpolate,
            "interpolate() applied to a component",
        ));
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn display_includes_kind_and_location() {
        let d = Diagnostic::error(DiagKind::UnknownIdentifier, "no binding for `tmp`")
            .with_loc(Some(SourceLoc { line: 4, column: 9 }));
        assert_eq!(
            d.to_string(),
            "error[unknown-identifier]: no binding for `tmp` at 4:9"
        );
    }
}

//! Diagnostic values and their builder.

use std::fmt;

use cadence_ir::Span;

use crate::ErrorCode;

/// How bad a diagnostic is.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Severity {
    Warning,
    Error,
}

/// A labeled source region inside a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub text: String,
    /// The first label attached is primary; the rest are context.
    pub is_primary: bool,
}

/// One reported problem, positioned and coded.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Start an error diagnostic. The message defaults to the code's
    /// description until `with_message` replaces it.
    pub fn error(code: ErrorCode) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            message: code.description().to_string(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Start a warning diagnostic.
    pub fn warning(code: ErrorCode) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Self::error(code)
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_label(mut self, span: Span, text: impl Into<String>) -> Self {
        let is_primary = self.labels.is_empty();
        self.labels.push(Label {
            span,
            text: text.into(),
            is_primary,
        });
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The primary span, if any label was attached.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels.first().map(|l| l.span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{kind}[{}]: {}", self.code, self.message)?;
        if let Some(span) = self.primary_span() {
            write!(f, " at {span:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_builder() {
        let diag = Diagnostic::error(ErrorCode::C3001)
            .with_message("resource `r` is lost")
            .with_label(Span::new(0, 5), "declared here")
            .with_note("move or destroy it before the scope ends");

        assert_eq!(diag.code, ErrorCode::C3001);
        assert!(diag.is_error());
        assert_eq!(diag.labels.len(), 1);
        assert!(diag.labels[0].is_primary);
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.primary_span(), Some(Span::new(0, 5)));
    }

    #[test]
    fn test_secondary_labels_not_primary() {
        let diag = Diagnostic::error(ErrorCode::C3002)
            .with_label(Span::new(10, 12), "used here")
            .with_label(Span::new(2, 4), "moved here");
        assert!(diag.labels[0].is_primary);
        assert!(!diag.labels[1].is_primary);
    }
}

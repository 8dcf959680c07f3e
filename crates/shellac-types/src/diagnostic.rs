//! Diagnostics surfaced to the host.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte range of a source node: `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: usize,
    pub len: usize,
}

impl SourceSpan {
    #[must_use]
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    #[must_use]
    pub const fn end(self) -> usize {
        self.start.saturating_add(self.len)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Error,
    ProofObligation,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Error => "error",
            Self::ProofObligation => "proof",
        };
        f.write_str(value)
    }
}

/// One diagnostic anchored to a source range of an analyzed unit.
///
/// For proof obligations the message is the obligation text, which is also
/// the stable identity used to persist completion across re-analyses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub unit: String,
    pub span: SourceSpan,
    pub message: String,
    /// `Some` only for proof obligations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl Diagnostic {
    pub fn error(unit: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            unit: unit.into(),
            span,
            message: message.into(),
            completed: None,
        }
    }

    pub fn proof(
        unit: impl Into<String>,
        span: SourceSpan,
        text: impl Into<String>,
        completed: bool,
    ) -> Self {
        Self {
            kind: DiagnosticKind::ProofObligation,
            unit: unit.into(),
            span,
            message: text.into(),
            completed: Some(completed),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, DiagnosticKind::Error)
    }

    /// Completion identity of a proof obligation.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self.kind {
            DiagnosticKind::ProofObligation => Some(&self.message),
            DiagnosticKind::Error => None,
        }
    }

    /// A proof obligation that the user has not marked done.
    #[must_use]
    pub fn is_open_obligation(&self) -> bool {
        self.kind == DiagnosticKind::ProofObligation && self.completed != Some(true)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} [{}] {}", self.unit, self.span, self.kind, self.message)?;
        if let Some(done) = self.completed {
            write!(f, " ({})", if done { "done" } else { "open" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_identity_is_message() {
        let diag = Diagnostic::proof("Sorter", SourceSpan::new(10, 4), "copy -> permutation", false);
        assert_eq!(diag.identity(), Some("copy -> permutation"));
        assert!(diag.is_open_obligation());
        assert_eq!(
            diag.to_string(),
            "Sorter:10..14 [proof] copy -> permutation (open)"
        );
    }

    #[test]
    fn errors_have_no_identity() {
        let diag = Diagnostic::error("Sorter", SourceSpan::default(), "boom");
        assert!(diag.is_error());
        assert_eq!(diag.identity(), None);
        assert!(!diag.is_open_obligation());
        let json = serde_json::to_string(&diag).unwrap();
        assert!(!json.contains("completed"), "{json}");
    }
}

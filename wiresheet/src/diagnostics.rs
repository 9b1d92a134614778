//! Non-fatal diagnostics reported alongside otherwise successful output.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A helper row matched more than one BOM row.
    AmbiguousMatch,
    /// A helper row matched no BOM row.
    NoMatch,
    /// A helper photo was appended to a row that already had one.
    PhotoAppended,
    /// A layout dimension could not be parsed; the default was used.
    InvalidLength,
    /// A layout mode option has an unknown value; the default was used.
    InvalidOption,
    /// Panel minimums do not fit the page; the priority order decided.
    InfeasibleLayout,
    /// The notes panel is likely to overflow.
    NotesOverflow,
    /// The drawing is larger than its panel and will be scaled down.
    DrawingScaled,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::AmbiguousMatch => "ambiguous_match",
            DiagnosticKind::NoMatch => "no_match",
            DiagnosticKind::PhotoAppended => "photo_appended",
            DiagnosticKind::InvalidLength => "invalid_length",
            DiagnosticKind::InvalidOption => "invalid_option",
            DiagnosticKind::InfeasibleLayout => "infeasible_layout",
            DiagnosticKind::NotesOverflow => "notes_overflow",
            DiagnosticKind::DrawingScaled => "drawing_scaled",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticKind::PhotoAppended | DiagnosticKind::DrawingScaled => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: String,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            subject: None,
            suggestion: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DiagnosticStats {
    pub warnings: usize,
    pub info: usize,
}

impl DiagnosticStats {
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let mut stats = Self::default();
        for d in diagnostics {
            match d.severity {
                Severity::Warning => stats.warnings += 1,
                Severity::Info => stats.info += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.warnings + self.info
    }
}

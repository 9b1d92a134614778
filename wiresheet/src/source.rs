//! Harness YAML: the `metadata` block that drives the sheet.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::WiresheetError;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::layout::length::PX_PER_MM;
use crate::layout::sheet::DEFAULT_MARGIN_MM;
use crate::layout::{LayoutConfig, LengthValue, PageArea, SheetSize};

const OVERFLOW_LINES_WITH_STRIP: usize = 9;
const OVERFLOW_LINES: usize = 13;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateMetadata {
    pub name: Option<String>,
    pub sheetsize: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    metadata: Option<serde_yaml::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    template: Option<TemplateMetadata>,
    notes: Option<serde_yaml::Value>,
    strip_detail_image: Option<serde_yaml::Value>,
    page_margin: Option<LengthValue>,
}

/// The parts of a harness YAML file wiresheet cares about.
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub template: TemplateMetadata,
    pub sheet_size: SheetSize,
    pub notes: String,
    pub strip_detail_image: bool,
    pub page_margin: Option<LengthValue>,
    pub layout: LayoutConfig,
    /// Problems found while reading the metadata.
    pub diagnostics: Vec<Diagnostic>,
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_enabled(value: &serde_yaml::Value) -> bool {
    match value {
        serde_yaml::Value::Bool(b) => *b,
        serde_yaml::Value::Null => false,
        other => scalar_text(other).is_some_and(|s| !s.trim().is_empty()),
    }
}

impl SourceDocument {
    /// Read and parse a harness YAML file.
    ///
    /// A missing file is an error; YAML that does not parse degrades to an
    /// empty document so the outputs can still be post-processed.
    pub fn load(path: &Path) -> Result<Self, WiresheetError> {
        if !path.is_file() {
            return Err(WiresheetError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut doc = Self::parse(&content);
        doc.path = path.to_path_buf();
        Ok(doc)
    }

    pub fn parse(content: &str) -> Self {
        let raw: RawDocument = match serde_yaml::from_str::<Option<RawDocument>>(content) {
            Ok(raw) => raw.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Could not parse harness YAML, ignoring metadata: {}", e);
                return Self::default();
            }
        };

        let mapping = match raw.metadata {
            Some(serde_yaml::Value::Mapping(m)) => m,
            Some(serde_yaml::Value::Null) | None => serde_yaml::Mapping::new(),
            Some(_) => {
                tracing::warn!("metadata is not a mapping, ignoring it");
                serde_yaml::Mapping::new()
            }
        };
        Self::from_metadata(mapping)
    }

    fn from_metadata(mapping: serde_yaml::Mapping) -> Self {
        let (layout, diagnostics) = LayoutConfig::from_metadata(&mapping);
        let metadata: RawMetadata =
            serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).unwrap_or_else(|e| {
                tracing::warn!("Unexpected metadata shape: {}", e);
                RawMetadata::default()
            });

        let template = metadata.template.unwrap_or_default();
        let sheet_size = SheetSize::parse_or_default(template.sheetsize.as_deref());
        let notes = metadata.notes.as_ref().and_then(scalar_text).unwrap_or_default();
        let strip_detail_image = metadata.strip_detail_image.as_ref().is_some_and(is_enabled);

        Self {
            path: PathBuf::new(),
            template,
            sheet_size,
            notes,
            strip_detail_image,
            page_margin: metadata.page_margin,
            layout,
            diagnostics,
        }
    }

    pub fn note_lines(&self) -> usize {
        self.notes.lines().filter(|l| !l.trim().is_empty()).count()
    }

    /// Warn when the notes panel is likely to need a scrollbar.
    pub fn notes_overflow_risk(&self) -> Option<Diagnostic> {
        let lines = self.note_lines();
        if self.strip_detail_image && lines >= OVERFLOW_LINES_WITH_STRIP {
            Some(
                Diagnostic::new(
                    DiagnosticKind::NotesOverflow,
                    format!(
                        "Notes panel may overflow (strip detail image is enabled and notes has {} non-empty lines)",
                        lines
                    ),
                )
                .with_subject("notes")
                .with_suggestion(
                    "Increase metadata.notes_width, reduce the strip detail image or shorten metadata.notes",
                ),
            )
        } else if lines >= OVERFLOW_LINES {
            Some(
                Diagnostic::new(
                    DiagnosticKind::NotesOverflow,
                    format!("Notes panel may overflow (notes has {} non-empty lines)", lines),
                )
                .with_subject("notes")
                .with_suggestion("Increase metadata.notes_width or shorten metadata.notes"),
            )
        } else {
            None
        }
    }

    /// Page margin in pixels; invalid or relative values use the default.
    pub fn margin_px(&self) -> f64 {
        let default = DEFAULT_MARGIN_MM * PX_PER_MM;
        match self.page_margin.as_ref().map(LengthValue::parse) {
            None => default,
            Some(Ok(length)) if !length.is_relative() => length.to_px(0.0),
            Some(_) => {
                tracing::warn!("metadata.page_margin must be an absolute length, using 10mm");
                default
            }
        }
    }

    pub fn page_area(&self) -> PageArea {
        PageArea::for_sheet(self.sheet_size, self.margin_px())
    }
}

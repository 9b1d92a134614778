//! Sheet layout resolution
//!
//! The engineering sheet template has three panels: notes on the side, the
//! BOM below, the drawing in the remaining space. Their sizes come from
//! `metadata` options in the harness YAML and from the measured content.
//!
//! Resolution is a pipeline of small steps:
//!
//! ```text
//! parse ──▶ resolve percentages ──▶ clamp BOM height ──▶ apply priorities
//! ```

pub mod length;
pub mod resolve;
pub mod sheet;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticKind};

pub use length::{format_px, Length, LengthError, LengthValue};
pub use resolve::{resolve, LayoutResolution};
pub use sheet::{inject_head_style, PageArea, SheetSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BomHeightMode {
    Fixed,
    #[default]
    Auto,
}

/// Which panel keeps its size when BOM and drawing compete for height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightPriority {
    #[default]
    Drawing,
    Bom,
}

/// Which panel keeps its size when notes and drawing compete for width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthPriority {
    #[default]
    Notes,
    Drawing,
}

/// Layout options as declared in `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub bom_height_mode: BomHeightMode,
    pub height_priority: HeightPriority,
    pub width_priority: WidthPriority,
    pub notes_width: Option<LengthValue>,
    pub notes_min_width: Option<LengthValue>,
    pub bom_height: Option<LengthValue>,
    pub bom_min_height: Option<LengthValue>,
    pub bom_max_height: Option<LengthValue>,
    pub drawing_min_height: Option<LengthValue>,
    pub drawing_min_width: Option<LengthValue>,
}

fn length_option(
    metadata: &serde_yaml::Mapping,
    key: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<LengthValue> {
    match metadata.get(key)? {
        serde_yaml::Value::String(s) => Some(LengthValue::Text(s.clone())),
        serde_yaml::Value::Number(n) => n.as_f64().map(LengthValue::Number),
        serde_yaml::Value::Null => None,
        other => {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::InvalidLength,
                    format!("metadata.{} must be a length, got {:?}; using the default", key, other),
                )
                .with_subject(key),
            );
            None
        }
    }
}

fn mode_option<T>(
    metadata: &serde_yaml::Mapping,
    key: &str,
    choices: &[(&str, T)],
    diagnostics: &mut Vec<Diagnostic>,
) -> T
where
    T: Copy + Default,
{
    let Some(value) = metadata.get(key) else {
        return T::default();
    };
    let text = value.as_str().map(|s| s.trim().to_ascii_lowercase());
    if let Some(text) = &text {
        if let Some((_, mode)) = choices.iter().find(|(name, _)| *name == text.as_str()) {
            return *mode;
        }
    }
    let allowed: Vec<&str> = choices.iter().map(|(name, _)| *name).collect();
    diagnostics.push(
        Diagnostic::new(
            DiagnosticKind::InvalidOption,
            format!(
                "metadata.{} must be one of {}; using the default",
                key,
                allowed.join(", ")
            ),
        )
        .with_subject(key),
    );
    T::default()
}

impl LayoutConfig {
    /// Read the layout options from a `metadata` mapping. Malformed values
    /// fall back to defaults and are reported, never rejected.
    pub fn from_metadata(metadata: &serde_yaml::Mapping) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let config = Self {
            bom_height_mode: mode_option(
                metadata,
                "bom_height_mode",
                &[("fixed", BomHeightMode::Fixed), ("auto", BomHeightMode::Auto)],
                &mut diagnostics,
            ),
            height_priority: mode_option(
                metadata,
                "height_priority",
                &[("drawing", HeightPriority::Drawing), ("bom", HeightPriority::Bom)],
                &mut diagnostics,
            ),
            width_priority: mode_option(
                metadata,
                "width_priority",
                &[("notes", WidthPriority::Notes), ("drawing", WidthPriority::Drawing)],
                &mut diagnostics,
            ),
            notes_width: length_option(metadata, "notes_width", &mut diagnostics),
            notes_min_width: length_option(metadata, "notes_min_width", &mut diagnostics),
            bom_height: length_option(metadata, "bom_height", &mut diagnostics),
            bom_min_height: length_option(metadata, "bom_min_height", &mut diagnostics),
            bom_max_height: length_option(metadata, "bom_max_height", &mut diagnostics),
            drawing_min_height: length_option(metadata, "drawing_min_height", &mut diagnostics),
            drawing_min_width: length_option(metadata, "drawing_min_width", &mut diagnostics),
        };
        (config, diagnostics)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelSize {
    pub width: f64,
    pub height: f64,
}

/// Natural (unconstrained) size of each panel's content, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSizes {
    pub notes: PanelSize,
    pub bom: PanelSize,
    pub drawing: PanelSize,
}

pub const BOM_HEADER_HEIGHT_PX: f64 = 22.0;
pub const BOM_ROW_HEIGHT_PX: f64 = 18.0;
pub const BOM_PHOTO_ROW_HEIGHT_PX: f64 = 64.0;
pub const NOTES_LINE_HEIGHT_PX: f64 = 16.0;
pub const STRIP_DETAIL_HEIGHT_PX: f64 = 120.0;

impl ContentSizes {
    /// Rough natural heights from what the sheet will contain.
    pub fn estimate(
        bom_rows: usize,
        bom_photo_rows: usize,
        note_lines: usize,
        strip_detail_image: bool,
    ) -> Self {
        let plain_rows = bom_rows.saturating_sub(bom_photo_rows);
        let bom_height = if bom_rows == 0 {
            0.0
        } else {
            BOM_HEADER_HEIGHT_PX
                + plain_rows as f64 * BOM_ROW_HEIGHT_PX
                + bom_photo_rows as f64 * BOM_PHOTO_ROW_HEIGHT_PX
        };
        let mut notes_height = note_lines as f64 * NOTES_LINE_HEIGHT_PX;
        if strip_detail_image {
            notes_height += STRIP_DETAIL_HEIGHT_PX;
        }
        Self {
            notes: PanelSize {
                width: 0.0,
                height: notes_height,
            },
            bom: PanelSize {
                width: 0.0,
                height: bom_height,
            },
            drawing: PanelSize::default(),
        }
    }

    pub fn with_drawing(mut self, drawing: PanelSize) -> Self {
        self.drawing = drawing;
        self
    }
}

/// Fully resolved panel sizes, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub notes_width: f64,
    pub drawing_width: f64,
    pub bom_height: f64,
    pub drawing_height: f64,
    pub drawing_min_height: f64,
    pub drawing_min_width: f64,
    pub bom_height_mode: BomHeightMode,
    pub height_priority: HeightPriority,
    pub width_priority: WidthPriority,
}

impl LayoutSpec {
    /// CSS custom properties consumed by the sheet template.
    pub fn to_css(&self) -> String {
        format!(
            ":root {{ --notes-width: {}; --drawing-width: {}; --bom-height: {}; \
--drawing-height: {}; --drawing-min-height: {}; --drawing-min-width: {}; }}",
            format_px(self.notes_width),
            format_px(self.drawing_width),
            format_px(self.bom_height),
            format_px(self.drawing_height),
            format_px(self.drawing_min_height),
            format_px(self.drawing_min_width),
        )
    }
}

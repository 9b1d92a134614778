//! Sheet sizes, the working area inside the page margins, and injection of
//! the resolved layout into the HTML sheet.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::layout::length::PX_PER_MM;

/// `id` of the `<style>` block owned by wiresheet.
pub const LAYOUT_STYLE_ID: &str = "wiresheet-layout";
/// Default page margin on every side, in millimetres.
pub const DEFAULT_MARGIN_MM: f64 = 10.0;

static LAYOUT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<style id="wiresheet-layout">.*?</style>\n?"#).unwrap()
});
static HEAD_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head>").unwrap());

/// Supported sheet sizes, always laid out landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SheetSize {
    #[default]
    A4,
    A3,
    A2,
    Letter,
    Legal,
    Tabloid,
}

impl SheetSize {
    pub const ALL: [SheetSize; 6] = [
        SheetSize::A4,
        SheetSize::A3,
        SheetSize::A2,
        SheetSize::Letter,
        SheetSize::Legal,
        SheetSize::Tabloid,
    ];

    /// Landscape `(width, height)` in millimetres.
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            SheetSize::A4 => (297.0, 210.0),
            SheetSize::A3 => (420.0, 297.0),
            SheetSize::A2 => (594.0, 420.0),
            SheetSize::Letter => (279.4, 215.9),
            SheetSize::Legal => (355.6, 215.9),
            SheetSize::Tabloid => (431.8, 279.4),
        }
    }

    /// Name as written in `metadata.template.sheetsize`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetSize::A4 => "A4",
            SheetSize::A3 => "A3",
            SheetSize::A2 => "A2",
            SheetSize::Letter => "LETTER",
            SheetSize::Legal => "LEGAL",
            SheetSize::Tabloid => "TABLOID",
        }
    }

    /// Page size keyword for CSS `@page`.
    pub fn css_name(&self) -> &'static str {
        match self {
            SheetSize::A4 => "A4",
            SheetSize::A3 => "A3",
            SheetSize::A2 => "A2",
            SheetSize::Letter => "Letter",
            SheetSize::Legal => "Legal",
            SheetSize::Tabloid => "Tabloid",
        }
    }

    /// Case-insensitive lookup; `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }

    /// Like [`SheetSize::from_name`], falling back to A4.
    pub fn parse_or_default(name: Option<&str>) -> Self {
        match name {
            None => Self::default(),
            Some(n) => Self::from_name(n).unwrap_or_else(|| {
                tracing::warn!("Unknown sheet size '{}', using A4", n);
                Self::default()
            }),
        }
    }
}

impl std::fmt::Display for SheetSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working area of the sheet after margins, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageArea {
    pub width: f64,
    pub height: f64,
}

impl PageArea {
    pub fn for_sheet(size: SheetSize, margin_px: f64) -> Self {
        let (w, h) = size.dimensions_mm();
        Self {
            width: (w * PX_PER_MM - 2.0 * margin_px).max(0.0),
            height: (h * PX_PER_MM - 2.0 * margin_px).max(0.0),
        }
    }
}

/// `@page` rule for the sheet; margins are drawn by the template.
pub fn page_css(size: SheetSize) -> String {
    format!(
        "@page {{ size: {} landscape; margin: 0; }} html, body {{ margin: 0; padding: 0; }}",
        size.css_name()
    )
}

/// Insert (or replace) the wiresheet `<style>` block in `html`.
///
/// The block goes right before `</head>`, or at the very start when the
/// document has no head. Running it twice yields the same document.
pub fn inject_head_style(html: &str, css: &str) -> String {
    let block = format!("<style id=\"{}\">\n{}\n</style>\n", LAYOUT_STYLE_ID, css);
    let stripped = LAYOUT_STYLE_RE.replace_all(html, "");
    match HEAD_CLOSE_RE.find(&stripped) {
        Some(m) => format!("{}{}{}", &stripped[..m.start()], block, &stripped[m.start()..]),
        None => format!("{}{}", block, stripped),
    }
}

pub fn has_layout_style(html: &str) -> bool {
    LAYOUT_STYLE_RE.is_match(html)
}

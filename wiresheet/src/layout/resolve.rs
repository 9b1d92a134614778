use crate::core::WiresheetError;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::layout::{
    format_px, BomHeightMode, ContentSizes, HeightPriority, LayoutConfig, LayoutSpec, Length,
    LengthValue, PageArea, WidthPriority,
};

/// The seven length options, in whatever stage of resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions<T> {
    pub notes_width: T,
    pub notes_min_width: T,
    pub bom_height: T,
    pub bom_min_height: T,
    pub bom_max_height: T,
    pub drawing_min_height: T,
    pub drawing_min_width: T,
}

impl Dimensions<Length> {
    /// Values used when an option is absent or unparsable.
    pub fn defaults() -> Self {
        Self {
            notes_width: Length::Percent(25.0),
            notes_min_width: Length::Percent(15.0),
            bom_height: Length::Percent(30.0),
            bom_min_height: Length::Percent(10.0),
            bom_max_height: Length::Percent(50.0),
            drawing_min_height: Length::Percent(40.0),
            drawing_min_width: Length::Percent(50.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutResolution {
    pub spec: LayoutSpec,
    pub diagnostics: Vec<Diagnostic>,
}

fn parse_one(
    key: &str,
    value: Option<&LengthValue>,
    default: Length,
    diagnostics: &mut Vec<Diagnostic>,
) -> Length {
    let Some(value) = value else {
        return default;
    };
    match value.parse() {
        Ok(length) => length,
        Err(e) => {
            tracing::warn!("Invalid length for {}: {}", key, e);
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::InvalidLength,
                    format!("metadata.{} = '{}' is not a length ({}); using {}", key, value, e, default),
                )
                .with_subject(key)
                .with_suggestion("Use an absolute length such as 40mm or 120px, or a percentage such as 25%"),
            );
            default
        }
    }
}

/// Step 1: parse every option, falling back to its default.
pub fn parse_dimensions(
    config: &LayoutConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Dimensions<Length> {
    let d = Dimensions::defaults();
    Dimensions {
        notes_width: parse_one("notes_width", config.notes_width.as_ref(), d.notes_width, diagnostics),
        notes_min_width: parse_one(
            "notes_min_width",
            config.notes_min_width.as_ref(),
            d.notes_min_width,
            diagnostics,
        ),
        bom_height: parse_one("bom_height", config.bom_height.as_ref(), d.bom_height, diagnostics),
        bom_min_height: parse_one(
            "bom_min_height",
            config.bom_min_height.as_ref(),
            d.bom_min_height,
            diagnostics,
        ),
        bom_max_height: parse_one(
            "bom_max_height",
            config.bom_max_height.as_ref(),
            d.bom_max_height,
            diagnostics,
        ),
        drawing_min_height: parse_one(
            "drawing_min_height",
            config.drawing_min_height.as_ref(),
            d.drawing_min_height,
            diagnostics,
        ),
        drawing_min_width: parse_one(
            "drawing_min_width",
            config.drawing_min_width.as_ref(),
            d.drawing_min_width,
            diagnostics,
        ),
    }
}

/// Step 2: widths resolve against the working width, heights against the
/// working height.
pub fn resolve_percentages(dims: &Dimensions<Length>, page: PageArea) -> Dimensions<f64> {
    Dimensions {
        notes_width: dims.notes_width.to_px(page.width),
        notes_min_width: dims.notes_min_width.to_px(page.width),
        bom_height: dims.bom_height.to_px(page.height),
        bom_min_height: dims.bom_min_height.to_px(page.height),
        bom_max_height: dims.bom_max_height.to_px(page.height),
        drawing_min_height: dims.drawing_min_height.to_px(page.height),
        drawing_min_width: dims.drawing_min_width.to_px(page.width),
    }
}

/// `value` limited to `[lo, hi]`; `lo` wins when the bounds cross.
pub fn clamp_between(value: f64, lo: f64, hi: f64) -> f64 {
    value.min(hi).max(lo)
}

/// Step 3: the BOM height before priorities are applied.
pub fn clamp_bom_height(
    mode: BomHeightMode,
    priority: HeightPriority,
    dims: &Dimensions<f64>,
    natural_height: f64,
    page_height: f64,
) -> f64 {
    match mode {
        BomHeightMode::Fixed => clamp_between(dims.bom_height, dims.bom_min_height, dims.bom_max_height),
        BomHeightMode::Auto => {
            let height = clamp_between(natural_height, dims.bom_min_height, dims.bom_max_height);
            let capped = height.min((page_height - dims.drawing_min_height).max(0.0));
            match priority {
                HeightPriority::Drawing => capped,
                HeightPriority::Bom => capped.max(dims.bom_min_height),
            }
        }
    }
}

/// Step 4a: split the working height between BOM and drawing.
/// Returns `(bom_height, drawing_height)`.
pub fn apply_height_priority(
    priority: HeightPriority,
    bom_height: f64,
    dims: &Dimensions<f64>,
    page_height: f64,
    diagnostics: &mut Vec<Diagnostic>,
) -> (f64, f64) {
    let drawing = dims.drawing_min_height.max(page_height - bom_height);
    match priority {
        HeightPriority::Drawing => {
            let bom = if bom_height + drawing > page_height {
                (page_height - drawing).max(0.0)
            } else {
                bom_height
            };
            if bom < dims.bom_min_height {
                diagnostics.push(infeasible(
                    "height",
                    format!(
                        "BOM shrinks to {} (minimum {}) so the drawing keeps {}",
                        format_px(bom),
                        format_px(dims.bom_min_height),
                        format_px(drawing)
                    ),
                ));
            }
            (bom, drawing)
        }
        HeightPriority::Bom => {
            if bom_height + drawing > page_height {
                diagnostics.push(infeasible(
                    "height",
                    format!(
                        "BOM ({}) and minimum drawing height ({}) exceed the working height ({})",
                        format_px(bom_height),
                        format_px(drawing),
                        format_px(page_height)
                    ),
                ));
            }
            (bom_height, drawing)
        }
    }
}

/// Step 4b: split the working width between notes and drawing.
/// Returns `(notes_width, drawing_width)`.
pub fn apply_width_priority(
    priority: WidthPriority,
    dims: &Dimensions<f64>,
    page_width: f64,
    diagnostics: &mut Vec<Diagnostic>,
) -> (f64, f64) {
    let notes = match priority {
        WidthPriority::Notes => dims.notes_width.max(dims.notes_min_width),
        WidthPriority::Drawing => {
            let available = page_width - dims.drawing_min_width;
            dims.notes_width.min(available).max(dims.notes_min_width)
        }
    };
    let drawing = (page_width - notes).max(0.0);
    if drawing < dims.drawing_min_width {
        diagnostics.push(infeasible(
            "width",
            format!(
                "Drawing gets {} (minimum {}) next to {} of notes",
                format_px(drawing),
                format_px(dims.drawing_min_width),
                format_px(notes)
            ),
        ));
    }
    (notes, drawing)
}

fn infeasible(axis: &str, message: String) -> Diagnostic {
    tracing::warn!("Infeasible {} layout: {}", axis, message);
    Diagnostic::new(DiagnosticKind::InfeasibleLayout, message)
        .with_subject(axis)
        .with_suggestion("Lower the panel minimums or choose a larger sheet size; the sheet may overflow")
}

/// Resolve the sheet layout for one build.
pub fn resolve(
    config: &LayoutConfig,
    content: &ContentSizes,
    page: PageArea,
) -> Result<LayoutResolution, WiresheetError> {
    if !(page.width.is_finite() && page.height.is_finite()) || page.width <= 0.0 || page.height <= 0.0 {
        return Err(WiresheetError::InvalidInput(format!(
            "page working area must be positive, got {} x {}",
            page.width, page.height
        )));
    }

    let mut diagnostics = Vec::new();
    let dims = parse_dimensions(config, &mut diagnostics);
    let px = resolve_percentages(&dims, page);

    let bom_height = clamp_bom_height(
        config.bom_height_mode,
        config.height_priority,
        &px,
        content.bom.height,
        page.height,
    );
    let (bom_height, drawing_height) =
        apply_height_priority(config.height_priority, bom_height, &px, page.height, &mut diagnostics);
    let (notes_width, drawing_width) =
        apply_width_priority(config.width_priority, &px, page.width, &mut diagnostics);

    if content.notes.height > page.height {
        diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::NotesOverflow,
                format!(
                    "Notes content ({}) is taller than the sheet ({})",
                    format_px(content.notes.height),
                    format_px(page.height)
                ),
            )
            .with_subject("notes")
            .with_suggestion("Increase metadata.notes_width or shorten metadata.notes"),
        );
    }
    if content.drawing.width > drawing_width || content.drawing.height > drawing_height {
        diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::DrawingScaled,
                format!(
                    "Drawing ({} x {}) is scaled down to fit {} x {}",
                    format_px(content.drawing.width),
                    format_px(content.drawing.height),
                    format_px(drawing_width),
                    format_px(drawing_height)
                ),
            )
            .with_subject("drawing"),
        );
    }

    let spec = LayoutSpec {
        notes_width,
        drawing_width,
        bom_height,
        drawing_height,
        drawing_min_height: px.drawing_min_height,
        drawing_min_width: px.drawing_min_width,
        bom_height_mode: config.bom_height_mode,
        height_priority: config.height_priority,
        width_priority: config.width_priority,
    };
    tracing::debug!("Resolved layout: {:?}", spec);

    Ok(LayoutResolution { spec, diagnostics })
}

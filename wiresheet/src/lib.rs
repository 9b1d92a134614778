//! wiresheet - post-processing for WireViz harness sheets
//!
//! WireViz renders a harness YAML into an SVG drawing, an HTML sheet and a
//! BOM. This library runs afterwards: it folds photo helper rows into the
//! BOM lines they describe, and sizes the notes, BOM and drawing panels of
//! the sheet from YAML metadata and the measured content.
//!
//! # Quick Start
//!
//! ```no_run
//! use wiresheet::{PostprocessOptions, WiresheetCore};
//! use std::path::Path;
//!
//! let result = WiresheetCore::postprocess(
//!     Path::new("drawing.yaml"),
//!     &PostprocessOptions::default(),
//! ).unwrap();
//!
//! for file in &result.files {
//!     println!("{} {:?}", file.path.display(), file.notes);
//! }
//! for d in &result.diagnostics {
//!     println!("{:?}: {}", d.severity, d.message);
//! }
//! ```
//!
//! # Features
//!
//! - **BOM reconciliation**: photo rows merged by designator or MPN, `SPN`
//!   relabeled `Product Photo`, image paths made output-relative
//! - **Sheet layout**: fixed/auto BOM height, drawing/BOM and notes/drawing
//!   priorities, lengths in px, mm, in, pt or percent
//! - **Sheet sizes**: A4, A3, A2, Letter, Legal, Tabloid

pub mod bom;
pub mod core;
pub mod diagnostics;
pub mod layout;
pub mod source;

// Re-export main types
pub use bom::{reconcile, BomRow, BomTable, HelperRow, HtmlBom, PathContext, Reconciliation};
pub use crate::core::{
    find_source_yaml, measure_svg, resolve_output_paths, FileReport, LayoutPreview, OutputPaths,
    PostprocessOptions, PostprocessResult, WiresheetCore, WiresheetError,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticStats, Severity};
pub use layout::{
    resolve, ContentSizes, LayoutConfig, LayoutResolution, LayoutSpec, Length, PageArea,
    SheetSize,
};
pub use source::SourceDocument;

/// Reconcile a `.bom.tsv` document (convenience wrapper).
pub fn reconcile_tsv(
    content: &str,
    paths: &PathContext,
) -> Result<(String, Vec<Diagnostic>), WiresheetError> {
    let (table, summary) = bom::parse_tsv(content)?.reconcile(paths);
    Ok((bom::write_tsv(&table)?, summary.diagnostics))
}

/// Reconcile the BOM table of an HTML sheet (convenience wrapper).
/// Documents without a BOM table are returned unchanged.
pub fn reconcile_html(
    content: &str,
    paths: &PathContext,
) -> Result<(String, Vec<Diagnostic>), WiresheetError> {
    match HtmlBom::parse(content)? {
        Some(mut bom) => {
            let summary = bom.reconcile(paths);
            Ok((bom.render(), summary.diagnostics))
        }
        None => Ok((content.to_string(), Vec::new())),
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Diagnostic, DiagnosticKind, LayoutConfig, LayoutSpec, PathContext, PostprocessOptions,
        PostprocessResult, Severity, WiresheetCore, WiresheetError,
    };
}

//! Sheet layout resolution

use wiresheet::layout::{BomHeightMode, HeightPriority, LengthValue, PanelSize, WidthPriority};
use wiresheet::prelude::*;
use wiresheet::{resolve, ContentSizes, PageArea, SheetSize, SourceDocument};

fn page(width: f64, height: f64) -> PageArea {
    PageArea { width, height }
}

fn bom_content(height: f64) -> ContentSizes {
    ContentSizes {
        bom: PanelSize { width: 0.0, height },
        ..Default::default()
    }
}

#[test]
fn test_fixed_height_is_clamped() {
    let config = LayoutConfig {
        bom_height_mode: BomHeightMode::Fixed,
        bom_height: Some(LengthValue::from("500px")),
        bom_min_height: Some(LengthValue::from("50px")),
        bom_max_height: Some(LengthValue::from("300px")),
        ..Default::default()
    };
    let out = resolve(&config, &ContentSizes::default(), page(2000.0, 2000.0)).unwrap();
    assert_eq!(out.spec.bom_height, 300.0);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_drawing_priority_shrinks_bom() {
    let config = LayoutConfig {
        height_priority: HeightPriority::Drawing,
        drawing_min_height: Some(LengthValue::from("200px")),
        bom_min_height: Some(LengthValue::from("0px")),
        ..Default::default()
    };
    let out = resolve(&config, &bom_content(150.0), page(1000.0, 220.0)).unwrap();
    assert_eq!(out.spec.drawing_height, 200.0);
    assert_eq!(out.spec.bom_height, 20.0);
}

#[test]
fn test_drawing_priority_reports_bom_below_minimum() {
    let config = LayoutConfig {
        drawing_min_height: Some(LengthValue::from("200px")),
        bom_min_height: Some(LengthValue::from("50px")),
        ..Default::default()
    };
    let out = resolve(&config, &bom_content(150.0), page(1000.0, 220.0)).unwrap();
    assert_eq!(out.spec.drawing_height, 200.0);
    assert_eq!(out.spec.bom_height, 20.0);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::InfeasibleLayout);
}

#[test]
fn test_bom_priority_keeps_minimum_bom() {
    let config = LayoutConfig {
        height_priority: HeightPriority::Bom,
        drawing_min_height: Some(LengthValue::from("200px")),
        bom_min_height: Some(LengthValue::from("50px")),
        ..Default::default()
    };
    let out = resolve(&config, &bom_content(150.0), page(1000.0, 220.0)).unwrap();
    assert_eq!(out.spec.bom_height, 50.0);
    assert_eq!(out.spec.drawing_height, 200.0);
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::InfeasibleLayout));
}

#[test]
fn test_percentages_resolve_against_page() {
    let config = LayoutConfig {
        notes_width: Some(LengthValue::from("25%")),
        ..Default::default()
    };
    let out = resolve(&config, &ContentSizes::default(), page(1000.0, 600.0)).unwrap();
    assert_eq!(out.spec.notes_width, 250.0);
    assert_eq!(out.spec.drawing_width, 750.0);
    assert_eq!(out.spec.drawing_min_width, 500.0);
    assert_eq!(out.spec.drawing_min_height, 240.0);
}

#[test]
fn test_auto_height_follows_content() {
    let config = LayoutConfig::default();
    let sheet = page(1000.0, 600.0);

    let small = resolve(&config, &bom_content(10.0), sheet).unwrap();
    assert_eq!(small.spec.bom_height, 60.0);

    let medium = resolve(&config, &bom_content(200.0), sheet).unwrap();
    assert_eq!(medium.spec.bom_height, 200.0);
    assert_eq!(medium.spec.drawing_height, 400.0);

    let large = resolve(&config, &bom_content(5000.0), sheet).unwrap();
    assert_eq!(large.spec.bom_height, 300.0);
}

#[test]
fn test_invalid_length_uses_default() {
    let config = LayoutConfig {
        notes_width: Some(LengthValue::from("wide")),
        ..Default::default()
    };
    let out = resolve(&config, &ContentSizes::default(), page(1000.0, 600.0)).unwrap();
    assert_eq!(out.spec.notes_width, 250.0);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::InvalidLength);
    assert_eq!(out.diagnostics[0].subject.as_deref(), Some("notes_width"));
}

#[test]
fn test_notes_priority_wins_width() {
    let config = LayoutConfig {
        width_priority: WidthPriority::Notes,
        notes_width: Some(LengthValue::from("600px")),
        ..Default::default()
    };
    let out = resolve(&config, &ContentSizes::default(), page(1000.0, 600.0)).unwrap();
    assert_eq!(out.spec.notes_width, 600.0);
    assert_eq!(out.spec.drawing_width, 400.0);
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::InfeasibleLayout);
}

#[test]
fn test_drawing_priority_wins_width() {
    let config = LayoutConfig {
        width_priority: WidthPriority::Drawing,
        notes_width: Some(LengthValue::from("600px")),
        ..Default::default()
    };
    let out = resolve(&config, &ContentSizes::default(), page(1000.0, 600.0)).unwrap();
    assert_eq!(out.spec.notes_width, 500.0);
    assert_eq!(out.spec.drawing_width, 500.0);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_oversized_drawing_is_reported() {
    let content = ContentSizes::default().with_drawing(PanelSize {
        width: 2000.0,
        height: 300.0,
    });
    let out = resolve(&LayoutConfig::default(), &content, page(1000.0, 600.0)).unwrap();
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagnosticKind::DrawingScaled);
    assert_eq!(out.diagnostics[0].severity, Severity::Info);
}

#[test]
fn test_output_has_no_relative_units() {
    let config = LayoutConfig {
        notes_width: Some(LengthValue::from("30%")),
        bom_height_mode: BomHeightMode::Fixed,
        bom_height: Some(LengthValue::from("45mm")),
        ..Default::default()
    };
    let out = resolve(&config, &ContentSizes::default(), page(1200.0, 800.0)).unwrap();
    let css = out.spec.to_css();
    assert!(!css.contains('%'));
    assert!(!css.contains("mm"));
    assert!(css.contains("--notes-width: 360px;"));
}

#[test]
fn test_layout_from_document_metadata() {
    let doc = SourceDocument::parse(
        "metadata:\n  template:\n    sheetsize: A4\n  bom_height_mode: fixed\n  bom_height: 20%\n",
    );
    let area = doc.page_area();
    assert_eq!(doc.sheet_size, SheetSize::A4);

    let out = resolve(&doc.layout, &ContentSizes::default(), area).unwrap();
    assert!((out.spec.bom_height - area.height * 0.2).abs() < 1e-9);
    assert!((out.spec.drawing_height - area.height * 0.8).abs() < 1e-9);
}

#[test]
fn test_rejects_degenerate_page() {
    for (w, h) in [(0.0, 500.0), (500.0, -1.0), (f64::NAN, 500.0), (500.0, f64::INFINITY)] {
        let result = resolve(&LayoutConfig::default(), &ContentSizes::default(), page(w, h));
        assert!(matches!(result, Err(WiresheetError::InvalidInput(_))));
    }
}

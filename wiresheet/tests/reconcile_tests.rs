//! BOM reconciliation behaviour

use indexmap::IndexMap;
use wiresheet::bom::PHOTO_COLUMN_LABEL;
use wiresheet::prelude::*;
use wiresheet::{reconcile, BomRow, HelperRow};

fn part(description: &str, designators: &str, mpn: &str) -> BomRow {
    let mut fields = IndexMap::new();
    fields.insert("Description".to_string(), description.to_string());
    fields.insert("Designators".to_string(), designators.to_string());
    fields.insert("MPN".to_string(), mpn.to_string());
    fields.insert("SPN".to_string(), String::new());
    BomRow::from_fields(fields)
}

fn photo_helper(yaml: &str) -> HelperRow {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_merge_by_designator() {
    let rows = vec![part("Connector", "X1", "43025-0400"), part("Cable", "W1", "")];
    let helpers = vec![photo_helper(
        "description: Photo of X1\ndesignators: X1\nspn: '<img src=\"x1.jpg\">'\n",
    )];

    let out = reconcile(&rows, &helpers, &PathContext::identity());
    assert_eq!(out.rows.len(), 2);
    assert_eq!(out.rows[0].field(PHOTO_COLUMN_LABEL), Some("<img src=\"x1.jpg\">"));
    assert_eq!(out.rows[1].field(PHOTO_COLUMN_LABEL), Some(""));
    assert!(out.rows.iter().all(|r| !r.fields.contains_key("SPN")));
    assert_eq!(out.summary.merged, 1);
    assert!(out.summary.diagnostics.is_empty());
}

#[test]
fn test_designator_backfill() {
    let rows = vec![part("Connector", "", "43025-0400")];
    let helpers = vec![photo_helper(
        "description: Photo\ndesignators: J1\nmpn: 43025-0400\nspn: '<img src=\"j1.jpg\">'\n",
    )];

    let out = reconcile(&rows, &helpers, &PathContext::identity());
    assert_eq!(out.rows.len(), 1);
    assert_eq!(out.rows[0].designators, vec!["J1"]);
    assert_eq!(out.rows[0].field("Designators"), Some("J1"));
    assert_eq!(out.rows[0].photo(), Some("<img src=\"j1.jpg\">"));
}

#[test]
fn test_ambiguous_part_number_is_retained() {
    let rows = vec![part("Ferrule", "F1", "ABC-123"), part("Ferrule", "F2", "ABC-123")];
    let helpers = vec![photo_helper(
        "description: Photo of ferrule\nmpn: ABC-123\nspn: '<img src=\"f.png\">'\n",
    )];

    let out = reconcile(&rows, &helpers, &PathContext::identity());
    assert_eq!(out.rows.len(), 3);
    assert!(out.rows[0].photo().is_none());
    assert!(out.rows[1].photo().is_none());
    assert_eq!(out.rows[2].photo(), Some("<img src=\"f.png\">"));
    assert_eq!(out.summary.retained, 1);
    assert_eq!(out.summary.diagnostics.len(), 1);
    assert_eq!(out.summary.diagnostics[0].kind, DiagnosticKind::AmbiguousMatch);
    assert_eq!(out.summary.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn test_unmatched_helpers_keep_their_order() {
    let rows = vec![part("Connector", "X1", "A")];
    let helpers = vec![
        photo_helper("description: Photo one\ndesignators: J8\nspn: '<img src=\"8.png\">'\n"),
        photo_helper("description: Photo two\ndesignators: X1\nspn: '<img src=\"x.png\">'\n"),
        photo_helper("description: Photo three\nmpn: ZZZ\nspn: '<img src=\"z.png\">'\n"),
    ];

    let out = reconcile(&rows, &helpers, &PathContext::identity());
    let descriptions: Vec<_> = out.rows.iter().map(|r| r.description()).collect();
    assert_eq!(descriptions, vec!["Connector", "Photo one", "Photo three"]);
    assert!(out
        .summary
        .diagnostics
        .iter()
        .all(|d| d.kind == DiagnosticKind::NoMatch));
}

#[test]
fn test_no_data_loss() {
    let rows = vec![
        part("Connector", "X1", "A"),
        part("Connector", "X2", "B"),
        part("Cable", "W1", ""),
    ];
    let helpers = vec![
        photo_helper("description: Photo\ndesignators: X2\nspn: '<img src=\"x2.png\">'\n"),
        photo_helper("description: Photo\ndesignators: Q7\nspn: '<img src=\"q.png\">'\n"),
        photo_helper("description: Photo\nmpn: A\nspn: '<img src=\"a.png\">'\n"),
    ];

    let out = reconcile(&rows, &helpers, &PathContext::identity());
    assert_eq!(out.rows.len(), rows.len() + out.summary.retained);
    assert_eq!(out.summary.merged + out.summary.retained, helpers.len());

    let kept: Vec<_> = out.rows[..rows.len()]
        .iter()
        .map(|r| r.designators.clone())
        .collect();
    assert_eq!(kept, vec![vec!["X1"], vec!["X2"], vec!["W1"]]);
}

#[test]
fn test_merge_is_idempotent() {
    let rows = vec![part("Connector", "X1", "A"), part("Cable", "W1", "")];
    let helpers = vec![photo_helper(
        "description: Photo\ndesignators: X1\nspn: '<img src=\"x1.jpg\">'\n",
    )];
    let paths = PathContext::identity();

    let once = reconcile(&rows, &helpers, &paths);
    let twice = reconcile(&once.rows, &[], &paths);
    assert_eq!(twice.rows, once.rows);
    assert!(!twice.summary.changed());
}

#[test]
fn test_output_relative_paths() {
    let rows = vec![part("Connector", "X1", "A")];
    let helpers = vec![photo_helper(
        "description: Photo\ndesignators: X1\nspn: '<img src=\"photos/x1.jpg\"> <img src=\"https://cdn.example.com/x.png\">'\n",
    )];
    let paths = PathContext::new("/work/harness", "/work/harness/output");

    let out = reconcile(&rows, &helpers, &paths);
    assert_eq!(
        out.rows[0].photo(),
        Some("<img src=\"../photos/x1.jpg\"> <img src=\"https://cdn.example.com/x.png\">")
    );
}

#[test]
fn test_reconcile_tsv_wrapper() {
    let tsv = "Id\tDescription\tDesignators\tMPN\tSPN\n\
1\tConnector\tX1\tA\t\n\
2\tPhoto of X1\tX1\t\t<img src=\"x1.jpg\">\n";
    let (out, diagnostics) = wiresheet::reconcile_tsv(tsv, &PathContext::identity()).unwrap();
    assert!(diagnostics.is_empty());
    assert_eq!(
        out,
        "Id\tDescription\tDesignators\tMPN\tProduct Photo\n1\tConnector\tX1\tA\t<img src=\"x1.jpg\">\n"
    );
}

#[test]
fn test_reconcile_html_without_table() {
    let html = "<html><body><p>No BOM</p></body></html>";
    let (out, diagnostics) = wiresheet::reconcile_html(html, &PathContext::identity()).unwrap();
    assert_eq!(out, html);
    assert!(diagnostics.is_empty());
}

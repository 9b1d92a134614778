use serde::Serialize;

use crate::bom::{BomRow, HelperRow, PathContext};
use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Which lookup decided a helper's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKey {
    Designator,
    PartNumber,
}

impl MatchKey {
    fn describe(&self) -> &'static str {
        match self {
            MatchKey::Designator => "designator",
            MatchKey::PartNumber => "manufacturer part number",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum MatchOutcome {
    Unique(usize, MatchKey),
    Ambiguous(usize, MatchKey),
    None,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileSummary {
    /// Helpers merged into a part row.
    pub merged: usize,
    /// Helpers kept as standalone rows.
    pub retained: usize,
    /// Photo cells whose image paths were rewritten.
    pub rewritten_paths: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconcileSummary {
    pub fn changed(&self) -> bool {
        self.merged > 0
    }
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub rows: Vec<BomRow>,
    pub summary: ReconcileSummary,
}

/// Designator intersection first, manufacturer part number second.
fn match_helper(rows: &[BomRow], helper: &HelperRow) -> MatchOutcome {
    if !helper.designators.is_empty() {
        let hits: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.designators.iter().any(|d| helper.designators.contains(d)))
            .map(|(i, _)| i)
            .collect();
        match hits.len() {
            0 => {}
            1 => return MatchOutcome::Unique(hits[0], MatchKey::Designator),
            n => return MatchOutcome::Ambiguous(n, MatchKey::Designator),
        }
    }

    let mpn = helper
        .manufacturer_part_number
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    if let Some(mpn) = mpn {
        let hits: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.manufacturer_part_number.as_deref() == Some(mpn))
            .map(|(i, _)| i)
            .collect();
        match hits.len() {
            0 => {}
            1 => return MatchOutcome::Unique(hits[0], MatchKey::PartNumber),
            n => return MatchOutcome::Ambiguous(n, MatchKey::PartNumber),
        }
    }

    MatchOutcome::None
}

/// Merge helper photo rows into the part rows they describe.
///
/// Matching runs against `bom_rows` as received, so the outcome for one
/// helper never depends on the helpers before it. Unmatched and ambiguous
/// helpers are appended after the part rows in their original order.
pub fn reconcile(
    bom_rows: &[BomRow],
    helper_rows: &[HelperRow],
    paths: &PathContext,
) -> Reconciliation {
    let mut rows = bom_rows.to_vec();
    let mut retained = Vec::new();
    let mut summary = ReconcileSummary::default();

    for helper in helper_rows {
        let photo = paths.rewrite_markup(&helper.photo_markup);
        if photo != helper.photo_markup {
            summary.rewritten_paths += 1;
        }
        match match_helper(bom_rows, helper) {
            MatchOutcome::Unique(idx, key) => {
                let target = &mut rows[idx];
                if target.designators.is_empty() && !helper.designators.is_empty() {
                    target.set_designators(helper.designators.clone());
                }
                let existing = target.photo().map(str::to_string);
                match existing {
                    Some(existing) => {
                        target.set_photo(format!("{existing} {photo}"));
                        summary.diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::PhotoAppended,
                                format!(
                                    "Helper row {} added a second photo to a row that already had one",
                                    helper.label()
                                ),
                            )
                            .with_subject(target.designators.join(", ")),
                        );
                    }
                    None => target.set_photo(photo),
                }
                tracing::debug!(
                    "Merged helper {} into BOM row {} by {}",
                    helper.label(),
                    idx,
                    key.describe()
                );
                summary.merged += 1;
            }
            MatchOutcome::Ambiguous(count, key) => {
                tracing::warn!(
                    "Helper {} matches {} BOM rows by {}; keeping it unmerged",
                    helper.label(),
                    count,
                    key.describe()
                );
                summary.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::AmbiguousMatch,
                        format!(
                            "Helper row {} matches {} BOM rows by {}; kept as its own line",
                            helper.label(),
                            count,
                            key.describe()
                        ),
                    )
                    .with_subject(helper.label())
                    .with_suggestion(
                        "Give the helper row a designator that names exactly one connector or cable",
                    ),
                );
                retained.push(retain(helper, photo));
                summary.retained += 1;
            }
            MatchOutcome::None => {
                tracing::warn!("Helper {} matches no BOM row", helper.label());
                summary.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::NoMatch,
                        format!(
                            "Helper row {} could not be linked to any BOM row; kept as its own line",
                            helper.label()
                        ),
                    )
                    .with_subject(helper.label())
                    .with_suggestion("Check the helper's designators or MPN against the BOM"),
                );
                retained.push(retain(helper, photo));
                summary.retained += 1;
            }
        }
    }

    rows.extend(retained);
    for row in &mut rows {
        row.relabel_photo_column();
    }

    Reconciliation { rows, summary }
}

fn retain(helper: &HelperRow, photo: String) -> BomRow {
    let mut helper = helper.clone();
    helper.photo_markup = photo;
    helper.into_bom_row()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::PHOTO_COLUMN_LABEL;

    fn part(designators: &str, mpn: &str) -> BomRow {
        BomRow::from_fields(
            [
                ("Description", "Connector"),
                ("Designators", designators),
                ("MPN", mpn),
                ("SPN", ""),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        )
    }

    fn helper(designators: &[&str], mpn: Option<&str>) -> HelperRow {
        HelperRow {
            description: "Photo".to_string(),
            designators: designators.iter().map(|d| d.to_string()).collect(),
            manufacturer_part_number: mpn.map(str::to_string),
            photo_markup: "<img src=\"p.jpg\">".to_string(),
            fields: Default::default(),
        }
    }

    #[test]
    fn test_match_by_designator_intersection() {
        let rows = vec![part("J1, J2", "A"), part("J3", "B")];
        assert_eq!(
            match_helper(&rows, &helper(&["J2"], None)),
            MatchOutcome::Unique(0, MatchKey::Designator)
        );
    }

    #[test]
    fn test_part_number_fallback() {
        let rows = vec![part("", "A"), part("J3", "B")];
        assert_eq!(
            match_helper(&rows, &helper(&["J1"], Some("A"))),
            MatchOutcome::Unique(0, MatchKey::PartNumber)
        );
    }

    #[test]
    fn test_designator_ambiguity_does_not_fall_back() {
        let rows = vec![part("J1", "A"), part("J1", "B")];
        assert_eq!(
            match_helper(&rows, &helper(&["J1"], Some("A"))),
            MatchOutcome::Ambiguous(2, MatchKey::Designator)
        );
    }

    #[test]
    fn test_no_identity_no_match() {
        let rows = vec![part("J1", "A")];
        assert_eq!(match_helper(&rows, &helper(&[], None)), MatchOutcome::None);
    }

    #[test]
    fn test_second_photo_is_appended() {
        let rows = vec![part("J1", "A")];
        let helpers = vec![helper(&["J1"], None), helper(&["J1"], None)];
        let out = reconcile(&rows, &helpers, &PathContext::identity());
        assert_eq!(out.rows.len(), 1);
        assert_eq!(
            out.rows[0].field(PHOTO_COLUMN_LABEL),
            Some("<img src=\"p.jpg\"> <img src=\"p.jpg\">")
        );
        assert_eq!(out.summary.merged, 2);
        assert_eq!(out.summary.diagnostics.len(), 1);
        assert_eq!(out.summary.diagnostics[0].kind, DiagnosticKind::PhotoAppended);
    }

    #[test]
    fn test_photo_path_rewritten_on_merge() {
        let rows = vec![part("J1", "A")];
        let ctx = PathContext::new("/proj", "/proj/output");
        let out = reconcile(&rows, &[helper(&["J1"], None)], &ctx);
        assert_eq!(
            out.rows[0].photo(),
            Some("<img src=\"../p.jpg\">")
        );
        assert_eq!(out.summary.rewritten_paths, 1);
    }
}

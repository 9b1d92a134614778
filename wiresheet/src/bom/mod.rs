//! BOM model and reconciliation
//!
//! WireViz renders every `additional_bom_items` entry as its own BOM line.
//! Entries whose description mentions "photo" and whose `SPN` cell carries
//! image markup are *helper rows*: they exist only to attach a photo to the
//! real part row with the same designator or manufacturer part number.
//!
//! ```text
//! ┌──────────────┐   split_helpers   ┌────────────┐
//! │  BomTable    │──────────────────▶│ part rows  │──┐
//! │ (tsv / html) │                   ├────────────┤  │  reconcile   ┌──────────────┐
//! └──────────────┘                   │ helper rows│──┴────────────▶│ merged table │
//!                                    └────────────┘                └──────────────┘
//! ```

pub mod html;
pub mod image_paths;
pub mod reconcile;
pub mod tsv;

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

pub use html::HtmlBom;
pub use image_paths::PathContext;
pub use reconcile::{reconcile, ReconcileSummary, Reconciliation};
pub use tsv::{parse_tsv, write_tsv};

/// Column WireViz fills from the `spn` field, reused for photo markup.
pub const PHOTO_COLUMN_SOURCE: &str = "SPN";
/// Display label of the photo column after reconciliation.
pub const PHOTO_COLUMN_LABEL: &str = "Product Photo";
pub const DESIGNATORS_COLUMN: &str = "Designators";
pub const MPN_COLUMN: &str = "MPN";
pub const DESCRIPTION_COLUMN: &str = "Description";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.*?>").unwrap());

/// Cell content with markup removed and surrounding whitespace trimmed.
pub(crate) fn plain_text(cell: &str) -> String {
    TAG_RE.replace_all(cell, "").trim().to_string()
}

pub(crate) fn split_designators(cell: &str) -> Vec<String> {
    plain_text(cell)
        .split(',')
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}

fn non_empty(cell: Option<&str>) -> Option<String> {
    cell.map(plain_text).filter(|s| !s.is_empty())
}

/// One rendered BOM line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomRow {
    pub designators: Vec<String>,
    pub manufacturer_part_number: Option<String>,
    pub fields: IndexMap<String, String>,
}

impl BomRow {
    /// Build a row from its cells, deriving designators and MPN from the
    /// `Designators` and `MPN` columns.
    pub fn from_fields(fields: IndexMap<String, String>) -> Self {
        let designators = fields
            .get(DESIGNATORS_COLUMN)
            .map(|c| split_designators(c))
            .unwrap_or_default();
        let manufacturer_part_number = non_empty(fields.get(MPN_COLUMN).map(String::as_str));
        Self {
            designators,
            manufacturer_part_number,
            fields,
        }
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn description(&self) -> String {
        self.field(DESCRIPTION_COLUMN).map(plain_text).unwrap_or_default()
    }

    /// Name of the column holding photo markup, if the row has one.
    pub fn photo_column(&self) -> Option<&'static str> {
        if self.fields.contains_key(PHOTO_COLUMN_SOURCE) {
            Some(PHOTO_COLUMN_SOURCE)
        } else if self.fields.contains_key(PHOTO_COLUMN_LABEL) {
            Some(PHOTO_COLUMN_LABEL)
        } else {
            None
        }
    }

    /// Non-empty photo markup.
    pub fn photo(&self) -> Option<&str> {
        self.photo_column()
            .and_then(|c| self.field(c))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn set_photo(&mut self, markup: impl Into<String>) {
        let column = self.photo_column().unwrap_or(PHOTO_COLUMN_LABEL);
        self.fields.insert(column.to_string(), markup.into());
    }

    pub fn set_designators(&mut self, designators: Vec<String>) {
        self.fields
            .insert(DESIGNATORS_COLUMN.to_string(), designators.join(", "));
        self.designators = designators;
    }

    /// Rename the `SPN` cell to `Product Photo`, keeping its position.
    pub fn relabel_photo_column(&mut self) {
        if !self.fields.contains_key(PHOTO_COLUMN_SOURCE) {
            return;
        }
        self.fields = std::mem::take(&mut self.fields)
            .into_iter()
            .map(|(k, v)| {
                if k == PHOTO_COLUMN_SOURCE {
                    (PHOTO_COLUMN_LABEL.to_string(), v)
                } else {
                    (k, v)
                }
            })
            .collect();
    }

    /// Helper rows mention "photo" in their description and carry markup
    /// in the photo column.
    pub fn is_photo_helper(&self) -> bool {
        self.photo().is_some() && self.description().to_lowercase().contains("photo")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn designators_from_yaml<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => split_designators(&s),
        Some(OneOrMany::Many(v)) => v
            .into_iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect(),
    })
}

/// BOM-shaped entry used only to attach a photo to another row.
///
/// Deserializes from the WireViz `additional_bom_items` shape
/// (`description`, `designators`, `mpn`, `spn`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperRow {
    pub description: String,
    #[serde(default, deserialize_with = "designators_from_yaml")]
    pub designators: Vec<String>,
    #[serde(default, rename = "mpn")]
    pub manufacturer_part_number: Option<String>,
    #[serde(default, rename = "spn")]
    pub photo_markup: String,
    /// Remaining cells of the rendered line, re-emitted if the row is retained.
    #[serde(skip)]
    pub fields: IndexMap<String, String>,
}

impl HelperRow {
    pub fn from_row(row: BomRow) -> Self {
        Self {
            description: row.description(),
            photo_markup: row.photo().unwrap_or_default().to_string(),
            designators: row.designators,
            manufacturer_part_number: row.manufacturer_part_number,
            fields: row.fields,
        }
    }

    /// Turn the helper back into a standalone BOM line.
    pub fn into_bom_row(self) -> BomRow {
        let mut row = if self.fields.is_empty() {
            let mut fields = IndexMap::new();
            fields.insert(DESCRIPTION_COLUMN.to_string(), self.description);
            fields.insert(DESIGNATORS_COLUMN.to_string(), self.designators.join(", "));
            fields.insert(
                MPN_COLUMN.to_string(),
                self.manufacturer_part_number.clone().unwrap_or_default(),
            );
            BomRow {
                designators: self.designators,
                manufacturer_part_number: self.manufacturer_part_number,
                fields,
            }
        } else {
            BomRow {
                designators: self.designators,
                manufacturer_part_number: self.manufacturer_part_number,
                fields: self.fields,
            }
        };
        row.set_photo(self.photo_markup);
        row
    }

    pub fn label(&self) -> String {
        if self.designators.is_empty() {
            match &self.manufacturer_part_number {
                Some(mpn) => format!("'{}' (MPN {})", self.description, mpn),
                None => format!("'{}'", self.description),
            }
        } else {
            format!("'{}' ({})", self.description, self.designators.join(", "))
        }
    }
}

/// Ordered BOM columns plus their rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BomTable {
    pub columns: Vec<String>,
    pub rows: Vec<BomRow>,
}

impl BomTable {
    pub fn new(columns: Vec<String>, rows: Vec<BomRow>) -> Self {
        Self { columns, rows }
    }

    /// Separate helper rows from part rows, preserving order within each.
    pub fn split_helpers(&self) -> (Vec<BomRow>, Vec<HelperRow>) {
        let mut parts = Vec::new();
        let mut helpers = Vec::new();
        for row in &self.rows {
            if row.is_photo_helper() {
                helpers.push(HelperRow::from_row(row.clone()));
            } else {
                parts.push(row.clone());
            }
        }
        (parts, helpers)
    }

    /// Reconcile helper rows into part rows and relabel the photo column.
    ///
    /// Image paths are only rewritten in a table that still has its `SPN`
    /// header, i.e. one straight from WireViz; there the part rows' own
    /// photos are rewritten too. A relabeled table has been processed
    /// already and its paths are output-relative.
    pub fn reconcile(&self, paths: &PathContext) -> (BomTable, ReconcileSummary) {
        let (mut parts, helpers) = self.split_helpers();
        let fresh = self.has_photo_source_column();
        let identity = PathContext::identity();
        let paths = if fresh { paths } else { &identity };

        let mut own_rewrites = 0;
        if fresh {
            for row in &mut parts {
                let Some(photo) = row.photo() else {
                    continue;
                };
                let rewritten = paths.rewrite_markup(photo);
                if rewritten != photo {
                    row.set_photo(rewritten);
                    own_rewrites += 1;
                }
            }
        }
        let Reconciliation { rows, mut summary } = reconcile(&parts, &helpers, paths);
        summary.rewritten_paths += own_rewrites;

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if c == PHOTO_COLUMN_SOURCE {
                    PHOTO_COLUMN_LABEL.to_string()
                } else {
                    c.clone()
                }
            })
            .collect();
        if !columns.iter().any(|c| c == PHOTO_COLUMN_LABEL)
            && rows.iter().any(|r| r.fields.contains_key(PHOTO_COLUMN_LABEL))
        {
            columns.push(PHOTO_COLUMN_LABEL.to_string());
        }

        (BomTable { columns, rows }, summary)
    }

    pub fn has_photo_source_column(&self) -> bool {
        self.columns.iter().any(|c| c == PHOTO_COLUMN_SOURCE)
    }

    pub fn photo_row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.photo().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> BomRow {
        BomRow::from_fields(
            cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_from_fields_derives_identity() {
        let r = row(&[
            ("Description", "Connector, Molex"),
            ("Designators", "J1, J2"),
            ("MPN", " 43025-0400 "),
        ]);
        assert_eq!(r.designators, vec!["J1", "J2"]);
        assert_eq!(r.manufacturer_part_number.as_deref(), Some("43025-0400"));
    }

    #[test]
    fn test_empty_cells_have_no_identity() {
        let r = row(&[("Designators", "  "), ("MPN", "")]);
        assert!(r.designators.is_empty());
        assert!(r.manufacturer_part_number.is_none());
    }

    #[test]
    fn test_relabel_keeps_position() {
        let mut r = row(&[("Id", "1"), ("SPN", "<img src=\"a.png\">"), ("Qty", "2")]);
        r.relabel_photo_column();
        let keys: Vec<_> = r.fields.keys().cloned().collect();
        assert_eq!(keys, vec!["Id", "Product Photo", "Qty"]);
        assert_eq!(r.photo(), Some("<img src=\"a.png\">"));
    }

    #[test]
    fn test_photo_helper_detection() {
        let helper = row(&[("Description", "Photo of J1"), ("SPN", "<img src=\"j1.jpg\">")]);
        assert!(helper.is_photo_helper());

        let no_markup = row(&[("Description", "Photo of J1"), ("SPN", "")]);
        assert!(!no_markup.is_photo_helper());

        let part = row(&[("Description", "Connector"), ("SPN", "<img src=\"j1.jpg\">")]);
        assert!(!part.is_photo_helper());
    }

    #[test]
    fn test_set_designators_updates_cell() {
        let mut r = row(&[("Designators", ""), ("MPN", "X")]);
        r.set_designators(vec!["J1".to_string()]);
        assert_eq!(r.field("Designators"), Some("J1"));
        assert_eq!(r.designators, vec!["J1"]);
    }

    #[test]
    fn test_helper_row_from_yaml() {
        let yaml = r#"
- description: Photo of X1
  designators: X1, X2
  spn: '<img src="photos/x1.jpg">'
- description: Photo of crimp
  designators: [F1]
  mpn: "5556"
"#;
        let items: Vec<HelperRow> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(items[0].designators, vec!["X1", "X2"]);
        assert_eq!(items[0].photo_markup, "<img src=\"photos/x1.jpg\">");
        assert_eq!(items[1].designators, vec!["F1"]);
        assert_eq!(items[1].manufacturer_part_number.as_deref(), Some("5556"));
        assert!(items[1].photo_markup.is_empty());
    }

    #[test]
    fn test_table_reconcile_twice_is_stable() {
        let table = BomTable::new(
            vec!["Description".into(), "Designators".into(), "SPN".into()],
            vec![
                row(&[("Description", "Bracket"), ("Designators", "B1"), ("SPN", "<img src=\"b1.png\">")]),
                row(&[("Description", "Photo of J9"), ("Designators", "J9"), ("SPN", "<img src=\"j9.png\">")]),
            ],
        );
        let paths = PathContext::new("/p", "/p/output");
        let (once, summary) = table.reconcile(&paths);
        assert_eq!(summary.retained, 1);
        assert_eq!(summary.rewritten_paths, 2);
        assert_eq!(once.columns[2], PHOTO_COLUMN_LABEL);
        assert_eq!(once.rows[0].photo(), Some("<img src=\"../b1.png\">"));

        let (twice, summary) = once.reconcile(&paths);
        assert_eq!(summary.rewritten_paths, 0);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_retained_helper_keeps_its_cells() {
        let source = row(&[
            ("Id", "4"),
            ("Description", "Photo of J9"),
            ("Designators", "J9"),
            ("SPN", "<img src=\"j9.jpg\">"),
        ]);
        let helper = HelperRow::from_row(source.clone());
        assert_eq!(helper.into_bom_row(), source);
    }
}

//! The `<table class="bom">` block of a WireViz HTML sheet.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::bom::{plain_text, BomRow, BomTable, PathContext, PHOTO_COLUMN_LABEL, PHOTO_COLUMN_SOURCE};
use crate::core::WiresheetError;

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)(<table class="bom">\s*)(.*?)(\s*</table>)"#).unwrap());
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<tr>.*?</tr>").unwrap());
static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<t([hd])\s+class="bom_col_([^"]+)"[^>]*>(.*?)</t[hd]>"#).unwrap()
});

const PHOTO_CLASS: &str = "spn";

/// An HTML sheet split around its BOM table.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlBom {
    /// Everything up to and including `<table class="bom">`.
    pub before: String,
    /// Everything from `</table>` on.
    pub after: String,
    /// CSS class suffix (`bom_col_<class>`) per column, parallel to `table.columns`.
    pub classes: Vec<String>,
    pub table: BomTable,
}

impl HtmlBom {
    /// Locate and parse the BOM table. Returns `Ok(None)` when the document
    /// has no BOM table at all.
    pub fn parse(html: &str) -> Result<Option<Self>, WiresheetError> {
        let Some(caps) = TABLE_RE.captures(html) else {
            return Ok(None);
        };
        let (Some(open), Some(body), Some(close)) = (caps.get(1), caps.get(2), caps.get(3)) else {
            return Ok(None);
        };

        let mut classes = Vec::new();
        let mut columns = Vec::new();
        let mut rows = Vec::new();

        for row_match in ROW_RE.find_iter(body.as_str()) {
            let cells: Vec<(bool, String, String)> = CELL_RE
                .captures_iter(row_match.as_str())
                .map(|c| (&c[1] == "h", c[2].to_string(), c[3].trim().to_string()))
                .collect();
            if cells.is_empty() {
                continue;
            }

            if cells.iter().all(|(is_header, _, _)| *is_header) {
                if columns.is_empty() {
                    for (_, class, label) in cells {
                        classes.push(class);
                        columns.push(plain_text(&label));
                    }
                }
                continue;
            }

            if columns.is_empty() {
                return Err(WiresheetError::InvalidInput(
                    "BOM table has data rows before its header row".to_string(),
                ));
            }

            let mut fields: IndexMap<String, String> = IndexMap::new();
            for (_, class, content) in cells {
                if let Some(pos) = classes.iter().position(|c| *c == class) {
                    fields.insert(columns[pos].clone(), content);
                }
            }
            rows.push(BomRow::from_fields(fields));
        }

        if columns.is_empty() {
            return Err(WiresheetError::InvalidInput(
                "BOM table has no header row".to_string(),
            ));
        }

        Ok(Some(Self {
            before: format!("{}{}", &html[..open.start()], open.as_str()),
            after: format!("{}{}", close.as_str(), &html[close.end()..]),
            classes,
            table: BomTable::new(columns, rows),
        }))
    }

    /// Reconcile the table in place; the photo column keeps its CSS class.
    pub fn reconcile(&mut self, paths: &PathContext) -> crate::bom::ReconcileSummary {
        let (table, summary) = self.table.reconcile(paths);
        if table.columns.len() > self.classes.len() {
            for column in &table.columns[self.classes.len()..] {
                self.classes.push(class_for(column));
            }
        }
        self.table = table;
        summary
    }

    /// Rewrite image paths in the document outside the BOM table.
    pub fn rewrite_surroundings(&mut self, paths: &PathContext) -> bool {
        let before = paths.rewrite_markup(&self.before);
        let after = paths.rewrite_markup(&self.after);
        let changed = before != self.before || after != self.after;
        self.before = before;
        self.after = after;
        changed
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.table.rows.len() + 1);

        let mut header = String::from("<tr>\n");
        for (class, label) in self.classes.iter().zip(&self.table.columns) {
            header.push_str(&format!("<th class=\"bom_col_{}\">{}</th>\n", class, label));
        }
        header.push_str("</tr>");
        lines.push(header);

        for row in &self.table.rows {
            let mut line = String::from("<tr>\n");
            for (class, column) in self.classes.iter().zip(&self.table.columns) {
                line.push_str(&format!(
                    "<td class=\"bom_col_{}\">{}</td>\n",
                    class,
                    row.field(column).unwrap_or("")
                ));
            }
            line.push_str("</tr>");
            lines.push(line);
        }

        format!("{}{}{}", self.before, lines.join("\n"), self.after)
    }
}

fn class_for(column: &str) -> String {
    if column == PHOTO_COLUMN_LABEL || column == PHOTO_COLUMN_SOURCE {
        return PHOTO_CLASS.to_string();
    }
    column
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

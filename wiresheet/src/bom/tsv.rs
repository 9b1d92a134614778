//! WireViz `.bom.tsv` reader/writer.
//!
//! WireViz joins cells with tabs and never quotes them, so quoting is off in
//! both directions; photo markup keeps its double quotes verbatim.

use indexmap::IndexMap;

use crate::bom::{BomRow, BomTable};
use crate::core::WiresheetError;

pub fn parse_tsv(content: &str) -> Result<BomTable, WiresheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.iter().all(|c| c.trim().is_empty()) {
        return Err(WiresheetError::InvalidInput(
            "TSV BOM has no header row".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let fields: IndexMap<String, String> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(BomRow::from_fields(fields));
    }

    Ok(BomTable::new(columns, rows))
}

pub fn write_tsv(table: &BomTable) -> Result<String, WiresheetError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(table.columns.iter().map(|c| row.field(c).unwrap_or("")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| WiresheetError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| WiresheetError::InvalidInput(format!("TSV BOM is not UTF-8: {}", e)))
}

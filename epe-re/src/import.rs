//! Alignment table import
//!
//! The first row names witness ids; each following row is one alignment
//! group whose cells hold the token id for that witness. An empty cell means
//! the witness has no token in that group and is left out of the mapping.
//!
//! Dialect: comma separated (tab separated when the header has tabs and no
//! commas), optional double quotes with `""` escapes, optional UTF-8 BOM,
//! LF or CRLF line endings. Blank lines are skipped. Quoted cells cannot
//! span lines.

use epe_common::{AlignmentGroup, Error, Result};
use tracing::debug;

/// Interpret a raw upload as UTF-8 text
pub fn decode_table(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw).map_err(|e| {
        Error::Encoding(format!(
            "alignment table is not valid UTF-8 (first bad byte at offset {})",
            e.valid_up_to()
        ))
    })
}

/// Parse a table into alignment groups, one per data row
pub fn parse_alignment_table(text: &str) -> Result<Vec<AlignmentGroup>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rows: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect();

    let (header_row, data_rows) = rows.split_first().ok_or(Error::EmptyInput)?;
    let delimiter = detect_delimiter(header_row);
    let headers: Vec<String> = split_cells(header_row, delimiter)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let groups: Vec<AlignmentGroup> = data_rows
        .iter()
        .map(|row| {
            let cells = split_cells(row, delimiter);
            headers
                .iter()
                .enumerate()
                .filter(|(_, witness_id)| !witness_id.is_empty())
                .filter_map(|(col, witness_id)| {
                    let cell = cells.get(col).map(|c| c.trim()).unwrap_or("");
                    (!cell.is_empty()).then(|| (witness_id.clone(), cell.to_string()))
                })
                .collect::<AlignmentGroup>()
        })
        .collect();

    debug!(
        "Parsed alignment table: {} witness columns, {} groups",
        headers.iter().filter(|h| !h.is_empty()).count(),
        groups.len()
    );
    Ok(groups)
}

fn detect_delimiter(header: &str) -> char {
    if header.contains('\t') && !header.contains(',') {
        '\t'
    } else {
        ','
    }
}

fn split_cells(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(c);
            }
        } else if c == '"' && cell.trim().is_empty() {
            cell.clear();
            in_quotes = true;
        } else if c == delimiter {
            cells.push(std::mem::take(&mut cell));
        } else {
            cell.push(c);
        }
    }
    cells.push(cell);
    cells
}

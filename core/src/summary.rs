//! Vela summary report.
//!
//! A header-row CSV. Each data row becomes a column-name to value map; a report with
//! a single data row collapses to that row.

use std::collections::BTreeMap;

use crate::internal::*;

pub type Row = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Summary {
    Single(Row),
    Multiple(Vec<Row>),
}

impl Summary {
    /// The row describing the compiled network: the only one, or the first.
    pub fn row(&self) -> Option<&Row> {
        match self {
            Summary::Single(row) => Some(row),
            Summary::Multiple(rows) => rows.first(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.row().and_then(|r| r.get(column)).map(|s| s.as_str())
    }

    /// Numeric column. Vela writes integers as floats sometimes (`1.2e+06`).
    pub fn number(&self, column: &str) -> SrmcResult<f64> {
        let value = self.get(column).with_context(|| format!("Summary has no `{column}' column"))?;
        value
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Summary column `{column}': can not parse {value:?} as a number"))
    }
}

/// Read a summary file. A missing file means the compiler reported nothing.
pub fn read_summary(path: &Path) -> SrmcResult<Option<Summary>> {
    if !path.exists() {
        warn!("Summary file {path:?} was not found");
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    let summary = parse_summary(&text)?;
    if let Some(row) = summary.as_ref().and_then(|s| s.row()) {
        for (key, value) in row {
            debug!("{key} = {value}");
        }
    }
    Ok(summary)
}

pub fn parse_summary(text: &str) -> SrmcResult<Option<Summary>> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(None);
    };
    let columns = split_record(header);
    let mut rows = vec![];
    for (ix, line) in lines.enumerate() {
        let values = split_record(line);
        ensure!(
            values.len() == columns.len(),
            "Summary row {} has {} fields, header has {}",
            ix + 1,
            values.len(),
            columns.len()
        );
        rows.push(columns.iter().cloned().zip(values).collect::<Row>());
    }
    Ok(match rows.len() {
        0 => None,
        1 => rows.pop().map(Summary::Single),
        _ => Some(Summary::Multiple(rows)),
    })
}

// RFC 4180 fields: quoted fields may hold commas, `""` is an escaped quote.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = vec![];
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

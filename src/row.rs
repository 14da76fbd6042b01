// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::traits::SummaryError;

/// Field delimiter for raw lines. No quoting or escaping is supported, so
/// values containing the delimiter cannot be represented.
pub const DELIMITER: char = ',';

/// One data record: an ordered sequence of string fields, positionally
/// aligned to a [`Header`].
pub type Row = Vec<String>;

/// Captured column schema of a summary.
///
/// Column lookup is by name, resolved once per query into a positional index
/// that is then used for every row in the sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    /// Builds a header from an already-split record.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Builds a header by splitting a raw delimited line.
    pub fn from_line(line: &str) -> Self {
        Self {
            columns: parse_line(line),
        }
    }

    /// Resolves a column name to its positional index.
    pub fn resolve(&self, name: &str) -> Result<usize, SummaryError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SummaryError::UnknownColumn(name.to_string()))
    }

    /// The column names, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Splits a raw line on the fixed delimiter and trims whitespace from each
/// field.
pub fn parse_line(line: &str) -> Row {
    line.split(DELIMITER).map(|s| s.trim().to_string()).collect()
}

/// Reads a numeric field from a row, or `None` when the index is out of range
/// for this row or the value does not parse as a finite number. Missing and
/// malformed values are absent, not zero.
pub fn numeric_field(row: &Row, idx: usize) -> Option<f64> {
    row.get(idx)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Sums a numeric column over a set of rows, returning the sum together with
/// the number of rows that contributed a value.
pub fn column_sum<'a, I>(rows: I, idx: usize) -> (f64, usize)
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut sum = 0.0;
    let mut count = 0;
    for row in rows {
        if let Some(v) = numeric_field(row, idx) {
            sum += v;
            count += 1;
        }
    }
    (sum, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_trims_fields() {
        assert_eq!(parse_line(" 1, Aarav ,Delhi "), vec!["1", "Aarav", "Delhi"]);
    }

    #[test]
    fn resolve_unknown_column() {
        let header = Header::from_line("id,name,salary");
        assert_eq!(header.resolve("salary").unwrap(), 2);
        assert!(matches!(
            header.resolve("bonus"),
            Err(SummaryError::UnknownColumn(_))
        ));
    }

    #[test]
    fn numeric_field_is_absent_not_zero() {
        let row: Row = vec!["x".into(), "".into(), "42.5".into()];
        assert_eq!(numeric_field(&row, 0), None);
        assert_eq!(numeric_field(&row, 1), None);
        assert_eq!(numeric_field(&row, 2), Some(42.5));
        assert_eq!(numeric_field(&row, 9), None);
    }
}

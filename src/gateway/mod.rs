//! Row sources and sinks addressed by sheet name and column range.

mod csv_dir;
mod memory;
#[cfg(feature = "sheets")]
pub mod sheets;

pub use csv_dir::CsvGateway;
pub use memory::MemoryGateway;
#[cfg(feature = "sheets")]
pub use sheets::GoogleSheetsGateway;

use crate::error::Result;
use crate::schema::CellValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub updated_rows: usize,
}

/// Read/write access to a spreadsheet-like store.
///
/// `read` returns every row of the range with the header as the first row.
/// `write` replaces the whole data region (row 2 onwards) and keeps the header.
#[allow(async_fn_in_trait)]
pub trait SheetGateway {
    async fn read(&self, sheet_name: &str, range: &str) -> Result<Vec<Vec<String>>>;

    async fn write(&self, sheet_name: &str, rows: &[Vec<CellValue>]) -> Result<WriteOutcome>;
}

impl<G: SheetGateway> SheetGateway for &G {
    async fn read(&self, sheet_name: &str, range: &str) -> Result<Vec<Vec<String>>> {
        (**self).read(sheet_name, range).await
    }

    async fn write(&self, sheet_name: &str, rows: &[Vec<CellValue>]) -> Result<WriteOutcome> {
        (**self).write(sheet_name, rows).await
    }
}

/// Number of columns covered by an A1 column range such as "A:O".
/// Returns `None` for ranges that are not a plain column span.
pub fn column_span(range: &str) -> Option<usize> {
    let (start, end) = range.split_once(':')?;
    let start = column_index(start)?;
    let end = column_index(end)?;
    (end >= start).then(|| end - start + 1)
}

/// 0-based index of a column label ("A" = 0, "Z" = 25, "AA" = 26).
fn column_index(label: &str) -> Option<usize> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    label.chars().try_fold(0usize, |acc, c| {
        c.is_ascii_alphabetic()
            .then(|| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
    })
    .map(|n| n - 1)
}

/// Trims each row to the columns a range selects, as a ranged read would.
pub(crate) fn apply_range(rows: Vec<Vec<String>>, range: &str) -> Vec<Vec<String>> {
    match column_span(range) {
        Some(width) => rows
            .into_iter()
            .map(|mut row| {
                row.truncate(width);
                row
            })
            .collect(),
        None => rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_span() {
        assert_eq!(column_span("A:O"), Some(15));
        assert_eq!(column_span("A:C"), Some(3));
        assert_eq!(column_span("a:n"), Some(14));
        assert_eq!(column_span("A:AA"), Some(27));
        assert_eq!(column_span("C:A"), None);
        assert_eq!(column_span("A2:Z"), None);
        assert_eq!(column_span("A"), None);
    }

    #[test]
    fn test_apply_range_truncates() {
        let rows = vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]];
        assert_eq!(apply_range(rows.clone(), "A:B")[0].len(), 2);
        assert_eq!(apply_range(rows, "A:Z")[0].len(), 3);
    }
}

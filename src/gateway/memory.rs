use super::{apply_range, SheetGateway, WriteOutcome};
use crate::error::{RefundError, Result};
use crate::schema::CellValue;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Keeps sheets in memory. Useful for tests and offline sessions.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    sheets: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a sheet's contents, header row included.
    pub fn with_sheet<R, C>(self, sheet_name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect::<Vec<String>>())
            .collect();
        self.lock_sheets().insert(sheet_name.to_string(), rows);
        self
    }

    /// Makes every subsequent read or write of `sheet_name` fail.
    pub fn fail_on(&self, sheet_name: &str) {
        self.lock_failing().insert(sheet_name.to_string());
    }

    /// Current contents of a sheet, header included.
    pub fn sheet(&self, sheet_name: &str) -> Option<Vec<Vec<String>>> {
        self.lock_sheets().get(sheet_name).cloned()
    }

    fn lock_sheets(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<Vec<String>>>> {
        self.sheets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_failing(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.failing.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self, sheet_name: &str) -> Result<()> {
        if self.lock_failing().contains(sheet_name) {
            return Err(RefundError::gateway(sheet_name, "sheet unavailable"));
        }
        Ok(())
    }
}

impl SheetGateway for MemoryGateway {
    async fn read(&self, sheet_name: &str, range: &str) -> Result<Vec<Vec<String>>> {
        self.check_available(sheet_name)?;
        let rows = self.lock_sheets().get(sheet_name).cloned().unwrap_or_default();
        Ok(apply_range(rows, range))
    }

    async fn write(&self, sheet_name: &str, rows: &[Vec<CellValue>]) -> Result<WriteOutcome> {
        self.check_available(sheet_name)?;
        let mut sheets = self.lock_sheets();
        let sheet = sheets.entry(sheet_name.to_string()).or_default();

        let header = sheet.first().cloned().unwrap_or_default();
        sheet.clear();
        sheet.push(header);
        sheet.extend(
            rows.iter()
                .map(|row| row.iter().map(ToString::to_string).collect::<Vec<_>>()),
        );

        Ok(WriteOutcome {
            updated_rows: rows.len(),
        })
    }
}

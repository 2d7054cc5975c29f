use super::{apply_range, SheetGateway, WriteOutcome};
use crate::error::{RefundError, Result};
use crate::schema::CellValue;
use csv::{ReaderBuilder, WriterBuilder};
use log::info;
use std::path::{Path, PathBuf};

/// Stores each sheet as `<sheet name>.csv` inside one directory.
#[derive(Debug, Clone)]
pub struct CsvGateway {
    dir: PathBuf,
}

impl CsvGateway {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, sheet_name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet_name))
    }

    fn read_all(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }
}

impl SheetGateway for CsvGateway {
    async fn read(&self, sheet_name: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let path = self.path_for(sheet_name);
        if !path.exists() {
            return Err(RefundError::gateway(
                sheet_name,
                format!("{} does not exist", path.display()),
            ));
        }
        let rows = Self::read_all(&path)?;
        Ok(apply_range(rows, range))
    }

    async fn write(&self, sheet_name: &str, rows: &[Vec<CellValue>]) -> Result<WriteOutcome> {
        let path = self.path_for(sheet_name);
        let header = if path.exists() {
            Self::read_all(&path)?.into_iter().next().unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut writer = WriterBuilder::new().flexible(true).from_path(&path)?;
        if !header.is_empty() {
            writer.write_record(&header)?;
        }
        for row in rows {
            writer.write_record(row.iter().map(ToString::to_string))?;
        }
        writer.flush()?;

        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(WriteOutcome {
            updated_rows: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "unit-refund-builder-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_read_applies_range() {
        let dir = scratch_dir("csv-read");
        fs::write(dir.join("Units.csv"), "name,rent,pct,extra\nA,50000,50,x\n").unwrap();

        let gateway = CsvGateway::new(&dir);
        let rows = block_on(gateway.read("Units", "A:C")).unwrap();
        assert_eq!(rows, vec![vec!["name", "rent", "pct"], vec!["A", "50000", "50"]]);
    }

    #[test]
    fn test_missing_file_is_gateway_error() {
        let dir = scratch_dir("csv-missing");
        let gateway = CsvGateway::new(&dir);
        assert!(matches!(
            block_on(gateway.read("Nope", "A:C")),
            Err(RefundError::Gateway { .. })
        ));
    }

    #[test]
    fn test_write_preserves_header() {
        let dir = scratch_dir("csv-write");
        fs::write(dir.join("Out.csv"), "month,total\n2024-03,1\n2024-02,2\n").unwrap();

        let gateway = CsvGateway::new(&dir);
        let outcome = block_on(gateway.write(
            "Out",
            &[vec![CellValue::from("2024-04"), CellValue::from(20500_i64)]],
        ))
        .unwrap();

        assert_eq!(outcome.updated_rows, 1);
        let content = fs::read_to_string(dir.join("Out.csv")).unwrap();
        assert_eq!(content, "month,total\n2024-04,20500\n");
    }
}

//! Conversion between raw spreadsheet rows and typed records.
//!
//! Rows are positional: the column order of each table is fixed by its
//! [`TableLayout`](crate::schema::TableLayout). The first row of every read is
//! the header and is discarded. Malformed cells never abort a parse; they are
//! replaced with defaults and reported as [`ParseDiagnostic`]s.

use crate::schema::{
    CellValue, MealCount, RefundDetail, TableKind, UnitAssignment, UnitMaster, UtilityCost,
};
use crate::utils::round_currency;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Only the first few data rows are checked for swapped ID/name columns.
pub const COLUMN_SWAP_SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseDiagnostic {
    UnparseableNumber {
        table: TableKind,
        /// 1-based spreadsheet row, header included
        row: usize,
        field: String,
        raw: String,
    },
    SuspectedColumnSwap {
        table: TableKind,
        row: usize,
        resident_id: String,
        resident_name: String,
    },
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDiagnostic::UnparseableNumber {
                table,
                row,
                field,
                raw,
            } => write!(
                f,
                "{} row {}: could not parse {} value \"{}\"; using 0",
                table, row, field, raw
            ),
            ParseDiagnostic::SuspectedColumnSwap {
                table,
                row,
                resident_id,
                resident_name,
            } => write!(
                f,
                "{} row {}: possible ID/name column swap (ID=\"{}\", name=\"{}\")",
                table, row, resident_id, resident_name
            ),
        }
    }
}

/// Records parsed from one table, with any anomalies found along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable<T> {
    pub records: Vec<T>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl<T> Default for ParsedTable<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// A record type with a fixed positional layout in the spreadsheet.
pub trait SheetRecord: Sized {
    const TABLE: TableKind;

    fn from_row(row: &mut RowReader<'_>) -> Self;

    fn to_row(&self) -> Vec<CellValue>;

    /// The (ID, name) pair checked by the column-swap heuristic, if the table
    /// carries resident identity.
    fn identity(&self) -> Option<(&str, &str)> {
        None
    }
}

/// Cursor over a single raw row that records diagnostics as cells are read.
pub struct RowReader<'a> {
    table: TableKind,
    row_number: usize,
    cells: &'a [String],
    diagnostics: &'a mut Vec<ParseDiagnostic>,
}

impl<'a> RowReader<'a> {
    pub fn new(
        table: TableKind,
        row_number: usize,
        cells: &'a [String],
        diagnostics: &'a mut Vec<ParseDiagnostic>,
    ) -> Self {
        Self {
            table,
            row_number,
            cells,
            diagnostics,
        }
    }

    pub fn text(&self, index: usize) -> String {
        parse_string(self.cells.get(index).map(String::as_str))
    }

    pub fn number(&mut self, index: usize, field: &str) -> f64 {
        let raw = self.cells.get(index).map(String::as_str).unwrap_or("");
        match parse_number(raw) {
            Some(value) => value,
            None => {
                if !raw.trim().is_empty() {
                    warn!(
                        "{} row {}: failed to parse {} from \"{}\"",
                        self.table, self.row_number, field, raw
                    );
                    self.diagnostics.push(ParseDiagnostic::UnparseableNumber {
                        table: self.table,
                        row: self.row_number,
                        field: field.to_string(),
                        raw: raw.to_string(),
                    });
                }
                0.0
            }
        }
    }

    pub fn amount(&mut self, index: usize, field: &str) -> i64 {
        round_currency(self.number(index, field))
    }
}

/// Trims a cell; a missing cell becomes the empty string.
pub fn parse_string(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Parses a spreadsheet number, tolerating thousands separators, yen signs
/// and full-width digits. Returns `None` when no numeric prefix remains.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '，' | '¥' | '￥' | '円' | '$'))
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '．' => '.',
            '－' | '−' => '-',
            _ => c,
        })
        .collect();

    parse_float_prefix(&cleaned)
}

/// Parses the longest leading decimal literal, ignoring trailing garbage.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].trim_end_matches('.').parse::<f64>().ok()
}

/// True when the ID cell looks like it holds a name: longer than the name
/// cell and not purely ASCII alphanumeric.
pub fn looks_like_column_swap(resident_id: &str, resident_name: &str) -> bool {
    resident_id.chars().count() > resident_name.chars().count()
        && !resident_id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Parses raw rows (header first) into records of type `T`.
pub fn parse_rows<T: SheetRecord>(rows: &[Vec<String>]) -> ParsedTable<T> {
    if rows.len() <= 1 {
        return ParsedTable::default();
    }

    let mut diagnostics = Vec::new();
    let mut records = Vec::with_capacity(rows.len() - 1);

    for (index, cells) in rows.iter().skip(1).enumerate() {
        let row_number = index + 2;
        let record = {
            let mut reader = RowReader::new(T::TABLE, row_number, cells, &mut diagnostics);
            T::from_row(&mut reader)
        };

        if index < COLUMN_SWAP_SAMPLE_ROWS {
            if let Some((id, name)) = record.identity() {
                if looks_like_column_swap(id, name) {
                    warn!(
                        "{} row {}: potential column swap, ID=\"{}\" name=\"{}\"",
                        T::TABLE,
                        row_number,
                        id,
                        name
                    );
                    diagnostics.push(ParseDiagnostic::SuspectedColumnSwap {
                        table: T::TABLE,
                        row: row_number,
                        resident_id: id.to_string(),
                        resident_name: name.to_string(),
                    });
                }
            }
        }

        records.push(record);
    }

    debug!(
        "Parsed {} {} records ({} diagnostics)",
        records.len(),
        T::TABLE,
        diagnostics.len()
    );

    ParsedTable {
        records,
        diagnostics,
    }
}

/// Serializes records into data rows in their table's column order.
pub fn to_rows<T: SheetRecord>(records: &[T]) -> Vec<Vec<CellValue>> {
    records.iter().map(SheetRecord::to_row).collect()
}

impl SheetRecord for UnitAssignment {
    const TABLE: TableKind = TableKind::UnitAssignment;

    fn from_row(row: &mut RowReader<'_>) -> Self {
        Self {
            month: row.text(0),
            resident_id: row.text(1),
            resident_name: row.text(2),
            unit_name: row.text(3),
            deposit_amount: row.number(4, "deposit_amount"),
            rent_subsidy: row.number(5, "rent_subsidy"),
            daily_goods_fee: row.number(6, "daily_goods_fee"),
            maintenance_fee: row.number(7, "maintenance_fee"),
            breakfast_unit_price: row.number(8, "breakfast_unit_price"),
            lunch_unit_price: row.number(9, "lunch_unit_price"),
            dinner_unit_price: row.number(10, "dinner_unit_price"),
            event_meal_unit_price: row.number(11, "event_meal_unit_price"),
            management_fee: row.number(12, "management_fee"),
            fire_insurance_fee: row.number(13, "fire_insurance_fee"),
            notes: row.text(14),
            ..Default::default()
        }
    }

    fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::from(self.month.as_str()),
            CellValue::from(self.resident_id.as_str()),
            CellValue::from(self.resident_name.as_str()),
            CellValue::from(self.unit_name.as_str()),
            CellValue::from(self.deposit_amount),
            CellValue::from(self.rent_subsidy),
            CellValue::from(self.daily_goods_fee),
            CellValue::from(self.maintenance_fee),
            CellValue::from(self.breakfast_unit_price),
            CellValue::from(self.lunch_unit_price),
            CellValue::from(self.dinner_unit_price),
            CellValue::from(self.event_meal_unit_price),
            CellValue::from(self.management_fee),
            CellValue::from(self.fire_insurance_fee),
            CellValue::from(self.notes.as_str()),
        ]
    }

    fn identity(&self) -> Option<(&str, &str)> {
        Some((&self.resident_id, &self.resident_name))
    }
}

impl SheetRecord for UnitMaster {
    const TABLE: TableKind = TableKind::UnitMaster;

    fn from_row(row: &mut RowReader<'_>) -> Self {
        Self {
            unit_name: row.text(0),
            rent: row.number(1, "rent"),
            utility_allocation_percent: row.number(2, "utility_allocation_percent"),
        }
    }

    fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::from(self.unit_name.as_str()),
            CellValue::from(self.rent),
            CellValue::from(self.utility_allocation_percent),
        ]
    }
}

impl SheetRecord for UtilityCost {
    const TABLE: TableKind = TableKind::UtilityCost;

    fn from_row(row: &mut RowReader<'_>) -> Self {
        Self {
            month: row.text(0),
            unit_name: row.text(1),
            electricity: row.number(2, "electricity"),
            gas: row.number(3, "gas"),
            water: row.number(4, "water"),
            sub: row.number(5, "sub"),
            total: row.number(6, "total"),
        }
    }

    fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::from(self.month.as_str()),
            CellValue::from(self.unit_name.as_str()),
            CellValue::from(self.electricity),
            CellValue::from(self.gas),
            CellValue::from(self.water),
            CellValue::from(self.sub),
            CellValue::from(self.total),
        ]
    }
}

impl SheetRecord for MealCount {
    const TABLE: TableKind = TableKind::MealCount;

    fn from_row(row: &mut RowReader<'_>) -> Self {
        Self {
            month: row.text(0),
            resident_id: row.text(1),
            resident_name: row.text(2),
            unit_name: row.text(3),
            breakfast_count: row.number(4, "breakfast_count"),
            lunch_count: row.number(5, "lunch_count"),
            dinner_count: row.number(6, "dinner_count"),
            event_meal_count: row.number(7, "event_meal_count"),
            notes: row.text(8),
        }
    }

    fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::from(self.month.as_str()),
            CellValue::from(self.resident_id.as_str()),
            CellValue::from(self.resident_name.as_str()),
            CellValue::from(self.unit_name.as_str()),
            CellValue::from(self.breakfast_count),
            CellValue::from(self.lunch_count),
            CellValue::from(self.dinner_count),
            CellValue::from(self.event_meal_count),
            CellValue::from(self.notes.as_str()),
        ]
    }

    fn identity(&self) -> Option<(&str, &str)> {
        Some((&self.resident_id, &self.resident_name))
    }
}

impl SheetRecord for RefundDetail {
    const TABLE: TableKind = TableKind::RefundDetail;

    fn from_row(row: &mut RowReader<'_>) -> Self {
        Self {
            month: row.text(0),
            resident_id: row.text(1),
            resident_name: row.text(2),
            unit_name: row.text(3),
            deposit_amount: row.amount(4, "deposit_amount"),
            rent: row.amount(5, "rent"),
            daily_goods: row.amount(6, "daily_goods"),
            maintenance_fee: row.amount(7, "maintenance_fee"),
            food_total: row.amount(8, "food_total"),
            utility_fee: row.amount(9, "utility_fee"),
            management_fee: row.amount(10, "management_fee"),
            fire_insurance: row.amount(11, "fire_insurance"),
            carry_over: row.amount(12, "carry_over"),
            net_refund_total: row.amount(13, "net_refund_total"),
            rent_subsidy: 0,
        }
    }

    fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::from(self.month.as_str()),
            CellValue::from(self.resident_id.as_str()),
            CellValue::from(self.resident_name.as_str()),
            CellValue::from(self.unit_name.as_str()),
            CellValue::from(self.deposit_amount),
            CellValue::from(self.rent),
            CellValue::from(self.daily_goods),
            CellValue::from(self.maintenance_fee),
            CellValue::from(self.food_total),
            CellValue::from(self.utility_fee),
            CellValue::from(self.management_fee),
            CellValue::from(self.fire_insurance),
            CellValue::from(self.carry_over),
            CellValue::from(self.net_refund_total),
        ]
    }
}

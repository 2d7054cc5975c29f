//! # Unit Refund Builder
//!
//! A library for computing the monthly refunds owed to residents of a
//! shared-living facility from spreadsheet-backed cost tables.
//!
//! ## Core Concepts
//!
//! - **Unit Assignment**: which unit a resident belongs to in a month, with their deposit and unit prices
//! - **Unit Master**: base rent and utility allocation percentage per unit
//! - **Utility Cost / Meal Count**: monthly unit utility totals and per-resident meal counts
//! - **Refund Detail**: the computed signed balance per resident per month
//! - **Fiscal Year**: a 12-month cycle beginning in April, used to order summaries
//!
//! Partial data never fails a calculation: missing joins contribute zero and
//! are tallied in the [`CalculationReport`]. Only configuration and gateway
//! failures are errors.
//!
//! ## Example
//!
//! ```rust,ignore
//! use unit_refund_builder::*;
//!
//! let gateway = CsvGateway::new("./data");
//! let processor = RefundProcessor::new(gateway);
//!
//! let session = futures::executor::block_on(processor.process())?;
//! for summary in session.summaries() {
//!     println!("{}: {}", summary.resident_name, summary.annual_refund_total);
//! }
//! futures::executor::block_on(processor.write_back(&session))?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod ingestion;
pub mod schema;
pub mod session;
pub mod summary;
pub mod transfers;
pub mod utils;
pub mod validator;

pub use config::{CalculationOptions, SheetsConfig};
pub use engine::{
    calculate_refunds, CalculatedRefund, CalculationReport, ChargeBreakdown, JoinStatus,
    RefundCalculation, RefundCalculator,
};
pub use error::{RefundError, Result};
pub use gateway::{CsvGateway, MemoryGateway, SheetGateway, WriteOutcome};
#[cfg(feature = "sheets")]
pub use gateway::GoogleSheetsGateway;
pub use ingestion::{parse_rows, to_rows, ParseDiagnostic, ParsedTable, SheetRecord};
pub use schema::*;
pub use session::{RefundProcessor, SessionCalculation, SessionSnapshot};
pub use summary::{summarize_by_resident, ResidentSummary};
pub use transfers::{detect_unit_transfers, TransferEvent, UnitTransfer};
pub use utils::{compare_fiscal_months, FISCAL_YEAR_START_MONTH};
pub use validator::{check_column_swaps, validate_data, ValidationWarning, WarningKind};

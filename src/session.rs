//! Load → calculate → write-back pipeline over an immutable session snapshot.

use crate::config::CalculationOptions;
use crate::engine::{calculate_refunds, CalculatedRefund, CalculationReport};
use crate::error::{RefundError, Result};
use crate::gateway::{SheetGateway, WriteOutcome};
use crate::ingestion::{parse_rows, to_rows, ParseDiagnostic, ParsedTable, SheetRecord};
use crate::schema::{InputTables, MealCount, RefundDetail, UnitAssignment, UnitMaster, UtilityCost};
use crate::summary::{summarize_by_resident, ResidentSummary};
use crate::transfers::{detect_unit_transfers, UnitTransfer};
use crate::validator::{
    ensure_unique_join_keys, find_duplicate_keys, validate_data, ValidationWarning,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Derived outputs of one calculation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCalculation {
    pub refunds: Vec<CalculatedRefund>,
    pub report: CalculationReport,
    pub summaries: Vec<ResidentSummary>,
}

/// Everything a session knows: the loaded tables, their informational
/// analyses and, once calculated, the derived refunds.
///
/// Snapshots are never mutated in place; `calculate` returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tables: InputTables,
    /// RefundDetail rows that were already in the sheet when loaded
    pub stored_refunds: Vec<RefundDetail>,
    pub diagnostics: Vec<ParseDiagnostic>,
    pub warnings: Vec<ValidationWarning>,
    pub transfers: Vec<UnitTransfer>,
    pub calculation: Option<SessionCalculation>,
}

impl SessionSnapshot {
    /// Builds a snapshot from typed tables and runs the informational passes.
    pub fn from_tables(
        tables: InputTables,
        stored_refunds: Vec<RefundDetail>,
        diagnostics: Vec<ParseDiagnostic>,
        options: &CalculationOptions,
    ) -> Result<Self> {
        if options.strict_keys {
            ensure_unique_join_keys(&tables)?;
        }

        let mut warnings = validate_data(
            &tables.unit_assignments,
            &tables.utility_costs,
            &tables.meal_counts,
        );
        warnings.extend(find_duplicate_keys(&tables).iter().map(|d| d.to_warning()));

        let transfers = detect_unit_transfers(&tables.unit_assignments);

        if !warnings.is_empty() {
            warn!("Data validation: {} warning(s)", warnings.len());
        }
        info!("Detected unit transfers for {} resident(s)", transfers.len());

        Ok(Self {
            tables,
            stored_refunds,
            diagnostics,
            warnings,
            transfers,
            calculation: None,
        })
    }

    /// Runs the refund calculation and returns a new snapshot holding it.
    pub fn calculate(&self) -> SessionSnapshot {
        let result = calculate_refunds(&self.tables);
        let details = result.details();
        let summaries = summarize_by_resident(&details);

        SessionSnapshot {
            calculation: Some(SessionCalculation {
                refunds: result.refunds,
                report: result.report,
                summaries,
            }),
            ..self.clone()
        }
    }

    /// Refund records to display: calculated ones if present, otherwise the
    /// ones loaded from the sheet.
    pub fn refund_details(&self) -> Vec<RefundDetail> {
        match &self.calculation {
            Some(calc) => calc.refunds.iter().map(|r| r.detail.clone()).collect(),
            None => self.stored_refunds.clone(),
        }
    }

    /// Summaries of whatever `refund_details` returns.
    pub fn summaries(&self) -> Vec<ResidentSummary> {
        match &self.calculation {
            Some(calc) => calc.summaries.clone(),
            None => summarize_by_resident(&self.stored_refunds),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Drives a session against a [`SheetGateway`].
pub struct RefundProcessor<G> {
    gateway: G,
    options: CalculationOptions,
}

impl<G: SheetGateway> RefundProcessor<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            options: CalculationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CalculationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    async fn fetch<T: SheetRecord>(&self) -> Result<ParsedTable<T>> {
        let layout = T::TABLE.layout();
        let rows = self.gateway.read(layout.sheet_name, layout.range).await?;
        Ok(parse_rows(&rows))
    }

    /// Reads every table concurrently. Any failed read aborts the load.
    pub async fn load(&self) -> Result<SessionSnapshot> {
        let (assignments, masters, utilities, meals, stored) = futures::try_join!(
            self.fetch::<UnitAssignment>(),
            self.fetch::<UnitMaster>(),
            self.fetch::<UtilityCost>(),
            self.fetch::<MealCount>(),
            self.fetch::<RefundDetail>(),
        )?;

        info!(
            "Loaded {} assignments, {} units, {} utility rows, {} meal rows, {} stored refunds",
            assignments.records.len(),
            masters.records.len(),
            utilities.records.len(),
            meals.records.len(),
            stored.records.len()
        );

        let diagnostics: Vec<ParseDiagnostic> = assignments
            .diagnostics
            .into_iter()
            .chain(masters.diagnostics)
            .chain(utilities.diagnostics)
            .chain(meals.diagnostics)
            .chain(stored.diagnostics)
            .collect();
        if !diagnostics.is_empty() {
            warn!("{} parse diagnostic(s) while loading", diagnostics.len());
        }

        let tables = InputTables {
            unit_assignments: assignments.records,
            unit_masters: masters.records,
            utility_costs: utilities.records,
            meal_counts: meals.records,
        };

        SessionSnapshot::from_tables(tables, stored.records, diagnostics, &self.options)
    }

    /// Loads and calculates in one step.
    pub async fn process(&self) -> Result<SessionSnapshot> {
        Ok(self.load().await?.calculate())
    }

    async fn replace<T: SheetRecord>(&self, records: &[T]) -> Result<WriteOutcome> {
        let layout = T::TABLE.layout();
        info!("Writing {} {} rows", records.len(), T::TABLE);
        self.gateway
            .write(layout.sheet_name, &to_rows(records))
            .await
    }

    /// Replaces the RefundDetail sheet with the snapshot's calculated refunds.
    pub async fn write_back(&self, snapshot: &SessionSnapshot) -> Result<WriteOutcome> {
        let calculation = snapshot
            .calculation
            .as_ref()
            .filter(|c| !c.refunds.is_empty())
            .ok_or(RefundError::NoCalculation)?;
        let details: Vec<RefundDetail> =
            calculation.refunds.iter().map(|r| r.detail.clone()).collect();
        self.replace(&details).await
    }

    pub async fn write_unit_assignments(&self, records: &[UnitAssignment]) -> Result<WriteOutcome> {
        self.replace(records).await
    }

    pub async fn write_meal_counts(&self, records: &[MealCount]) -> Result<WriteOutcome> {
        self.replace(records).await
    }
}

use futures::executor::block_on;
use std::error::Error;
use unit_refund_builder::*;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./data".to_string());

    println!("📂 Loading sheets from {}...\n", dir);

    let processor = RefundProcessor::new(CsvGateway::new(&dir));
    let session = block_on(processor.load())?;

    for diagnostic in &session.diagnostics {
        println!("⚠️  {}", diagnostic);
    }
    for warning in &session.warnings {
        println!("⚠️  {} ({})", warning.message, warning.details);
    }
    for transfer in &session.transfers {
        for change in &transfer.changes {
            println!(
                "🔁 {} ({}) moved {} → {} in {}",
                transfer.resident_name,
                transfer.resident_id,
                change.from_unit,
                change.to_unit,
                change.month
            );
        }
    }

    let session = session.calculate();
    if let Some(calculation) = &session.calculation {
        let report = &calculation.report;
        println!(
            "\n✅ Calculated {} refunds ({} complete, {} partial)",
            report.total, report.complete, report.partial
        );
        println!(
            "   Deposits: {}  Expenses: {}  Refunds: {}\n",
            report.total_deposit, report.total_expense, report.total_refund
        );
    }

    println!("{:<20} {:>12} {:>12} {:>12}", "Resident", "Deposit", "Expense", "Refund");
    println!("{}", "-".repeat(60));
    for summary in session.summaries() {
        println!(
            "{:<20} {:>12} {:>12} {:>12}",
            summary.resident_name,
            summary.annual_deposit_total,
            summary.annual_expense_total,
            summary.annual_refund_total
        );
    }

    let outcome = block_on(processor.write_back(&session))?;
    println!("\n💾 Wrote {} rows to {}", outcome.updated_rows, TableKind::RefundDetail.layout().sheet_name);

    Ok(())
}

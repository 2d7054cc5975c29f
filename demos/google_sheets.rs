use dotenv::dotenv;
use unit_refund_builder::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let gateway = GoogleSheetsGateway::from_env()?;
    let processor = RefundProcessor::new(gateway).with_options(CalculationOptions::strict());

    println!("📊 Reading spreadsheet...\n");
    let session = processor.process().await?;

    if !session.warnings.is_empty() {
        println!("⚠️  {} validation warning(s)", session.warnings.len());
        for warning in session.warnings.iter().take(10) {
            println!("   - {}", warning.message);
        }
    }

    for summary in session.summaries() {
        println!(
            "{} ({}): {} month(s), refund {}",
            summary.resident_name,
            summary.resident_id,
            summary.monthly.len(),
            summary.annual_refund_total
        );
    }

    let outcome = processor.write_back(&session).await?;
    println!("\n✅ Updated {} rows", outcome.updated_rows);

    std::fs::write("refund_session.json", session.to_json()?)?;
    println!("💾 Saved session snapshot to refund_session.json");

    Ok(())
}

#![cfg(not(tarpaulin_include))]

use ethanol_dashboard::aggregate::{by_category, by_user, total_summary};
use ethanol_dashboard::record::round2;
use ethanol_dashboard::store::{FileStore, RECORDS_COLLECTION, RecordStore};
use std::env;

/// Print the community summary for a data directory
///
/// Usage: `report [data_dir]` (defaults to `DASHBOARD_DATA_DIR`, then `database`).
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let data_dir = args
        .get(1)
        .cloned()
        .or_else(|| env::var("DASHBOARD_DATA_DIR").ok())
        .unwrap_or_else(|| "database".to_string());

    let store = FileStore::open(&data_dir)?;
    let records = store.list_records(RECORDS_COLLECTION)?;

    if records.is_empty() {
        println!("No community data yet in {}", data_dir);
        return Ok(());
    }

    let summary = total_summary(&records);
    println!("Community Summary ({} records)", records.len());
    println!("  Total Waste Processed (kg):        {}", round2(summary.total_quantity));
    println!("  Total Ethanol Produced (litres):   {}", round2(summary.total_ethanol));
    match summary.efficiency_percent {
        Some(pct) => println!("  Average Conversion Efficiency (%): {}", round2(pct)),
        None => println!("  Average Conversion Efficiency (%): —"),
    }

    println!("\nEthanol by Waste Type");
    for row in by_category(&records) {
        println!("  {:<30} {:>10.2} L", row.category, row.ethanol);
    }

    println!("\nTop Contributors");
    for (rank, row) in by_user(&records).iter().enumerate() {
        println!(
            "  {:>2}. {:<24} {:>10.2} kg {:>10.2} L",
            rank + 1,
            row.user,
            row.total_quantity,
            row.total_ethanol
        );
    }

    Ok(())
}

//! # Goldbook CLI
//!
//! Re-prices or summarises one month of an exported purchase list.
//!
//! ## Usage
//! ```bash
//! # Re-price May 2025 and print the updated purchases plus the month total
//! cargo run -p goldbook-service --bin goldbook -- reprice purchases.json 5 2025
//!
//! # Dashboard figures for May 2025 as of a given day
//! cargo run -p goldbook-service --bin goldbook -- summary purchases.json 5 2025 --today 2025-06-10
//!
//! # Use a specific config file
//! cargo run -p goldbook-service --bin goldbook -- summary purchases.json 5 2025 --config ./goldbook.toml
//! ```
//!
//! `purchases.json` is a JSON array of purchases in the camelCase wire shape.
//! Results are printed to stdout as JSON; logs go to stderr.

use std::env;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use goldbook_service::telemetry::init_tracing;
use goldbook_service::{GoldbookConfig, InMemoryStore, PurchaseService};

fn print_usage() {
    println!("Goldbook pricing engine");
    println!();
    println!("Usage: goldbook <reprice|summary> <purchases.json> <month> <year> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>    Config file (default: $GOLDBOOK_CONFIG or platform dir)");
    println!("  -t, --today <DATE>     Evaluation date, YYYY-MM-DD (default: local today)");
    println!("  -h, --help             Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut positional: Vec<String> = Vec::new();
    let mut config_path: Option<PathBuf> = None;
    let mut today = Local::now().date_naive();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--today" | "-t" => {
                if i + 1 < args.len() {
                    today = NaiveDate::parse_from_str(&args[i + 1], "%Y-%m-%d")?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let [command, path, month, year] = positional.as_slice() else {
        print_usage();
        return Err("expected <command> <purchases.json> <month> <year>".into());
    };
    let month: u32 = month.parse()?;
    let year: i32 = year.parse()?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be 1-12, got {}", month).into());
    }

    init_tracing();

    let config = GoldbookConfig::load(config_path)?;
    let store = InMemoryStore::from_json(&std::fs::read_to_string(path)?)?;
    let service = PurchaseService::from_config(store, &config)?;

    let output = match command.as_str() {
        "reprice" => serde_json::to_string_pretty(&service.reprice_month(month, year, today).await?)?,
        "summary" => serde_json::to_string_pretty(&service.month_summary(month, year, today).await?)?,
        other => {
            print_usage();
            return Err(format!("unknown command '{}'", other).into());
        }
    };

    println!("{}", output);
    Ok(())
}

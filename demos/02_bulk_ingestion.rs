/// bulk ingestion - load customer and loan files from a data directory
///
/// usage: cargo run --example 02_bulk_ingestion -- [config.json]
use credit_approval_rs::{
    run_ingestion, to_json_pretty, AppConfig, CreditEngine, CreditLedger, SafeTimeProvider,
    TimeSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };

    let time = SafeTimeProvider::new(TimeSource::System);
    let ledger = CreditLedger::new(CreditEngine::new(config.policy.clone())?);

    let report = run_ingestion(&ledger, &config.ingestion, &time)?;
    println!("{}", to_json_pretty(&report)?);
    println!("customers: {}, loans: {}", ledger.customer_count(), ledger.loan_count());

    Ok(())
}

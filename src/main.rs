#![cfg(not(tarpaulin_include))]

use std::env;
use std::fs;

use invoice_ledger::app;
use invoice_ledger::config::AppConfig;
use log::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    // Config file path, `ledger.json` in the working directory by default
    let config_path = args.get(1).map(String::as_str).unwrap_or("ledger.json");
    let config = AppConfig::load_or_default(config_path)?;

    if let Some(parent) = config.ledger_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::create_dir_all(&config.agreements_dir)?;
    info!(
        "ledger at {}, intake at {}",
        config.ledger_path.display(),
        config.intake_path.display()
    );

    app::run(config).await?;

    Ok(())
}

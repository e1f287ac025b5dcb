#![cfg(not(tarpaulin_include))]

use ethanol_dashboard::app;
use ethanol_dashboard::config::Config;
use std::env;

/// Main entry point for the web application
///
/// Settings come from the environment (`DASHBOARD_ADDR`,
/// `DASHBOARD_DATA_DIR`, `DASHBOARD_SESSION_HOURS`); an optional first
/// argument overrides the bind address.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?.with_addr_arg(args.get(1).map(String::as_str))?;

    app::run(config).await
}

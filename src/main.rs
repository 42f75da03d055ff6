// In src/main.rs

use restaurant_sim::{
    config::{Config, CONFIG},
    restaurant::Restaurant,
};

use anyhow::Context;
use log::{error, info};

/// Main entry point for the restaurant simulation.
///
/// Usage: `restaurant-sim [config.json]`. Without an argument the file named
/// by `RESTAURANT_CONFIG` is used, or the built-in defaults.
fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting restaurant simulation...");

    // --- Configuration ---
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)?,
        None => CONFIG.clone(),
    };
    info!(
        "Configuration loaded: {} customers, run for {:?}",
        config.customers.len(),
        config.run.duration()
    );

    // --- Open ---
    let restaurant =
        Restaurant::open_headless(&config).context("Failed to open the restaurant")?;
    restaurant.make_all_hungry();

    std::thread::sleep(config.run.duration());

    // --- Close ---
    info!("End of day:\n{}", restaurant.summary());
    let report = restaurant.shutdown();
    let failed: Vec<_> = report
        .iter()
        .filter(|(_, phase)| phase.is_failed())
        .collect();
    for (name, phase) in &failed {
        error!("Agent {} ended with {}", name, phase);
    }
    if !failed.is_empty() {
        anyhow::bail!("{} agent(s) failed", failed.len());
    }

    info!("Restaurant simulation finished.");
    Ok(())
}

//! Server/Stats Registry
//!
//! Pool membership and per-server statistics. Stats are diagnostic: a server
//! that does not answer is left out of the table instead of failing the call.

use std::collections::HashMap;

use crate::driver::Driver;
use crate::error::Result;

/// "host:port" -> stat name -> stat value
pub type StatsTable = HashMap<String, HashMap<String, String>>;

/// Append the servers named by `spec` to the driver's pool
pub fn add_server<D: Driver>(driver: &mut D, spec: &str) -> Result<usize> {
    let added = driver.add_server(spec)?;
    tracing::info!("Added {} server(s) from {:?}", added, spec);
    Ok(added)
}

/// Query every configured server and build a fresh stats table
pub fn collect_stats<D: Driver>(driver: &mut D) -> StatsTable {
    let mut table = StatsTable::new();
    for server in driver.servers() {
        match driver.stats_for(&server) {
            Ok(stats) => {
                table.insert(server.label(), stats);
            }
            Err(code) => {
                tracing::warn!(
                    "Skipping stats for {}: {}",
                    server,
                    driver.message(code)
                );
            }
        }
    }
    table
}

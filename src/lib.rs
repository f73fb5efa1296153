//! Estimates the charging infrastructure needed by electric ride-hailing fleets.
//!
//! For each region, the duty cycles of a range of driver types are simulated over several days.
//! A fleet is then sampled from these driver types until it covers the region's ride-hailing
//! travel demand, giving the number of fast chargers needed.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod region;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod units;

#[cfg(test)]
mod fixture;

/// The name of the folder containing the program's config files
const CONFIG_DIR_NAME: &str = "ridehail-evi";

/// Get the path to the folder containing the program's config files
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

//! Functionality for running the simulation.
use crate::input::Model;
use crate::output::DataWriter;
use crate::region::{RegionID, RegionInput};
use crate::scenario::Scenario;
use crate::units::{Dimensionless, Hours};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::path::Path;

pub mod charging;
use charging::{ChargeTimeMap, calc_charge_times};
pub mod permutation;
use permutation::{Permutation, generate_permutations};
pub mod sampling;
use sampling::{SampledFleet, sample_fleet};
pub mod vehicle;

/// Hours in a day
const HOURS_PER_DAY: Hours = Hours(24.0);

/// The results of the simulation for one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionResult {
    /// The region's inputs
    pub region: RegionInput,
    /// The simulated driver permutations
    pub permutations: Vec<Permutation>,
    /// The fleet needed to meet the region's travel demand
    pub fleet: SampledFleet,
    /// Number of fast chargers needed
    pub chargers: f64,
}

/// Run the simulation.
///
/// Regions are simulated in parallel. If any region fails, the whole run fails.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. charging profiles) to file
pub fn run(model: &Model, output_path: &Path, debug_model: bool) -> Result<()> {
    let scenario = &model.scenario;
    log_scenario(scenario);
    let charge_times = calc_charge_times(scenario, &model.power_curve)?;

    info!("Simulating {} regions...", model.regions.len());
    let results = model
        .regions
        .values()
        .collect_vec()
        .into_par_iter()
        .map(|region| {
            run_region(scenario, region, &charge_times)
                .with_context(|| format!("Simulation failed for region {}", region.id))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut writer = DataWriter::create(output_path, debug_model)?;
    writer.write_charge_profiles(&charge_times)?;
    for result in &results {
        writer.write_permutations(&result.permutations)?;
        writer.write_population(result)?;
    }
    writer.flush()?;

    log_summary(&results);

    Ok(())
}

/// Log the scenario's parameters
fn log_scenario(scenario: &Scenario) {
    info!("Scenario variables:");
    for (name, value) in scenario.iter_values() {
        info!("\t{name}: {value}");
    }
}

/// Simulate a single region
fn run_region(
    scenario: &Scenario,
    region: &RegionInput,
    charge_times: &ChargeTimeMap,
) -> Result<RegionResult> {
    let permutations = generate_permutations(scenario, region, charge_times)?;

    let mut rng = ChaCha8Rng::seed_from_u64(region_seed(scenario.seed, &region.id));
    let fleet = sample_fleet(&permutations, region.travel_demand, &mut rng)?;
    let chargers = chargers_needed(fleet.fast_charge_hours, scenario.utilization_perc);
    info!(
        "Region {}: {} vehicles drive {} miles and need {chargers:.1} fast chargers",
        region.id, fleet.vehicles, fleet.distance
    );

    Ok(RegionResult {
        region: region.clone(),
        permutations,
        fleet,
        chargers,
    })
}

/// The number of fast chargers needed to provide the given hours of charging each day
fn chargers_needed(fast_charge_hours: Hours, utilisation: Dimensionless) -> f64 {
    (fast_charge_hours / (HOURS_PER_DAY * utilisation)).value()
}

/// Seed for a region's random number generator.
///
/// Each region gets its own stream of random numbers, so the results do not depend on the order
/// in which regions are simulated.
fn region_seed(seed: u64, region_id: &RegionID) -> u64 {
    // 64-bit FNV-1a
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = region_id
        .as_str()
        .bytes()
        .fold(OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(PRIME)
        });

    hash ^ seed
}

/// Log total chargers and vehicles across all regions
fn log_summary(results: &[RegionResult]) {
    let chargers: f64 = results.iter().map(|result| result.chargers).sum();
    let vehicles: u32 = results.iter().map(|result| result.fleet.vehicles).sum();
    let chargers = chargers.floor();

    info!("Number of chargers: {chargers}");
    info!("Number of vehicles: {vehicles}");
    if chargers > 0.0 {
        info!("Vehicles per charger: {:.2}", f64::from(vehicles) / chargers);
    } else {
        warn!("No fast chargers are needed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{charge_times, region, scenario};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_chargers_needed() {
        // 24 hours of charging with chargers in use a quarter of the time
        assert_approx_eq!(f64, chargers_needed(Hours(24.0), Dimensionless(0.25)), 4.0);
        assert_eq!(chargers_needed(Hours(0.0), Dimensionless(0.25)), 0.0);
    }

    #[test]
    fn test_region_seed() {
        let a = RegionID::new("31080");
        let b = RegionID::new("41860");
        assert_eq!(region_seed(666, &a), region_seed(666, &a));
        assert_ne!(region_seed(666, &a), region_seed(666, &b));
        assert_ne!(region_seed(666, &a), region_seed(667, &a));
    }

    #[rstest]
    fn test_run_region(scenario: Scenario, region: RegionInput, charge_times: ChargeTimeMap) {
        let result = run_region(&scenario, &region, &charge_times).unwrap();

        assert_eq!(result.permutations.len(), 12);
        assert!(result.fleet.distance >= region.travel_demand);
        assert!(result.fleet.vehicles > 0);
        assert_approx_eq!(
            f64,
            result.chargers,
            result.fleet.fast_charge_hours.value() / (24.0 * 0.3)
        );

        // Deterministic for a given seed
        assert_eq!(
            run_region(&scenario, &region, &charge_times).unwrap(),
            result
        );
    }
}

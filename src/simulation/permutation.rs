//! Enumeration of the kinds of driver found in a region.
//!
//! A driver permutation is a combination of home charging access, shift length and battery size.
//! Each permutation is simulated once and given an integer weight reflecting how common it is.
use super::charging::ChargeTimeMap;
use super::vehicle::{VehicleParams, simulate_n_days};
use crate::region::{RegionID, RegionInput};
use crate::scenario::{Distribution, Scenario};
use crate::units::{Dimensionless, Energy, EnergyPerMile, Hours, Miles, MilesPerHour, Power};
use anyhow::{Context, Result};
use itertools::iproduct;
use log::debug;

/// The simulated behaviour of one kind of driver in a region, averaged over the simulated days
#[derive(Debug, Clone, PartialEq)]
pub struct Permutation {
    /// The region
    pub region_id: RegionID,
    /// Identifies the permutation, in the form `<home>_<shift>_<battery>`
    pub key: String,
    /// Whether the driver can charge at home
    pub home_charging: bool,
    /// Length of the driver's shift
    pub shift_length: Hours,
    /// Battery capacity
    pub battery_capacity: Energy,
    /// Number of drivers of this kind out of a hundred (rounded down)
    pub weight: u32,
    /// Average number of fast charges per day
    pub fast_charges_per_day: f64,
    /// Average distance driven per day
    pub distance_per_day: Miles,
    /// Time spent charging at each fast charge
    pub fast_charge_time: Hours,
    /// Energy left in the battery when the driver seeks a fast charge
    pub seek_charge_energy: Energy,
    /// Maximum power of the home charger
    pub home_charger_power: Power,
    /// Number of days simulated
    pub sim_days: u32,
    /// Time spent connecting to a fast charger, in minutes
    pub plug_in_mins: f64,
    /// Time a fast charger is occupied for at each fast charge
    pub plug_occupied_time: Hours,
    /// Average energy added by fast charging per day
    pub fast_charge_energy_per_day: Energy,
    /// Average energy added by home charging per day
    pub home_charge_energy_per_day: Energy,
    /// Regional vehicle efficiency
    pub efficiency: EnergyPerMile,
    /// Regional average speed
    pub avg_speed: MilesPerHour,
}

/// The distribution of home charging access in a region.
///
/// Category "1" is drivers with access and "0" is those without.
fn home_access_distribution(home_access_percent: u32) -> Result<Distribution<bool>> {
    Distribution::new([
        (
            "0",
            false,
            f64::from(100u32.saturating_sub(home_access_percent)),
        ),
        ("1", true, f64::from(home_access_percent)),
    ])
}

/// Calculate the weight of a permutation from percentages for each of its components
fn permutation_weight(home_percent: f64, shift_percent: f64, battery_percent: f64) -> u32 {
    (home_percent * shift_percent * battery_percent / (100.0 * 100.0 * 100.0) * 100.0).floor()
        as u32
}

/// Simulate every driver permutation for a region.
///
/// # Arguments
///
/// * `scenario` - The scenario parameters
/// * `region` - The region's inputs
/// * `charge_times` - Fast-charging times for each battery size in the scenario
///
/// # Returns
///
/// One [`Permutation`] per combination of home charging access, shift length and battery size,
/// in that order of nesting.
pub fn generate_permutations(
    scenario: &Scenario,
    region: &RegionInput,
    charge_times: &ChargeTimeMap,
) -> Result<Vec<Permutation>> {
    let home_dist = home_access_distribution(region.home_access_percent)?;
    let shift_dist = scenario.shift_length_dist.per_hundred();
    let battery_dist = scenario.veh_kwh_dict.per_hundred();
    let days = Dimensionless(f64::from(scenario.sim_days));

    iproduct!(home_dist.iter(), shift_dist.iter(), battery_dist.iter())
        .map(
            |(
                (home_label, home_charging, home_percent),
                (shift_label, shift_length, shift_percent),
                (battery_label, battery_capacity, battery_percent),
            )| {
                let key = format!("{home_label}_{shift_label}_{battery_label}");
                let charge_time = charge_times
                    .get(battery_label)
                    .with_context(|| format!("No charging time for {battery_label} kWh battery"))?;
                let plug_occupied_time = charge_time.duration + scenario.plug_in_time();
                let params = VehicleParams {
                    battery_capacity,
                    home_charging,
                    shift_length,
                    avg_speed: region.avg_speed,
                    efficiency: region.efficiency,
                    seek_charge_energy: scenario.soc_low * battery_capacity,
                    fast_charge_duration: plug_occupied_time,
                    fast_charge_target: scenario.soc_high,
                    home_charger_power: scenario.l2_max_kw,
                };

                let run = simulate_n_days(&params, scenario.initial_soc, scenario.sim_days)
                    .with_context(|| {
                        format!("Error simulating permutation {key} for region {}", region.id)
                    })?;
                let weight = permutation_weight(home_percent, shift_percent, battery_percent);
                debug!(
                    "Region {}: permutation {key} has weight {weight}, drives {} miles and fast \
                     charges {} times",
                    region.id, run.distance, run.fast_charges
                );

                Ok(Permutation {
                    region_id: region.id.clone(),
                    key,
                    home_charging,
                    shift_length,
                    battery_capacity,
                    weight,
                    fast_charges_per_day: f64::from(run.fast_charges) / days.value(),
                    distance_per_day: run.distance / days,
                    fast_charge_time: charge_time.duration,
                    seek_charge_energy: params.seek_charge_energy,
                    home_charger_power: scenario.l2_max_kw,
                    sim_days: scenario.sim_days,
                    plug_in_mins: scenario.plug_in_mins,
                    plug_occupied_time,
                    fast_charge_energy_per_day: run.fast_charge_energy / days,
                    home_charge_energy_per_day: run.home_charge_energy / days,
                    efficiency: region.efficiency,
                    avg_speed: region.avg_speed,
                })
            },
        )
        .collect()
}

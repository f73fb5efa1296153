//! The module responsible for writing output data to disk.
use crate::region::RegionID;
use crate::scenario::{SCENARIO_FILE_NAME, Scenario};
use crate::simulation::RegionResult;
use crate::simulation::charging::ChargeTimeMap;
use crate::simulation::permutation::Permutation;
use anyhow::{Context, Result, ensure};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The output file name for driver permutations
const PERMUTATIONS_FILE_NAME: &str = "permutation_results.csv";

/// The output file name for regional fleet results
const POPULATION_FILE_NAME: &str = "population_results.csv";

/// The output file name for fast-charging profiles
const CHARGE_PROFILES_FILE_NAME: &str = "debug_charge_profiles.csv";

/// Get the path to the output folder for a scenario.
///
/// This is a subfolder of the scenario's `output_dir`, named after the scenario and the current
/// time, e.g. `baseline--06_30_2025_14_05`.
pub fn get_output_dir(scenario: &Scenario) -> PathBuf {
    let timestamp = Local::now().format("%m_%d_%Y_%H_%M");
    scenario
        .output_dir
        .join(format!("{}--{timestamp}", scenario.scenario_name))
}

/// Create a new output directory, if it doesn't already exist.
///
/// # Arguments
///
/// * `output_dir` - The folder to create
/// * `allow_overwrite` - Whether to delete the contents of the folder if it is not empty
///
/// # Returns
///
/// Whether an existing non-empty folder was overwritten, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let is_empty = if output_dir.is_dir() {
        output_dir.read_dir()?.next().is_none()
    } else {
        true
    };

    if !is_empty {
        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
             --overwrite command-line option."
        );
        fs::remove_dir_all(output_dir)?;
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(!is_empty)
}

/// Copy the scenario file into the output folder, so there is a record of the inputs used
pub fn write_scenario_copy(output_path: &Path, model_dir: &Path, scenario: &Scenario) -> Result<()> {
    let src = model_dir.join(SCENARIO_FILE_NAME);
    let dest = output_path.join(format!("{}_sim_inputs.toml", scenario.scenario_name));
    fs::copy(&src, &dest)
        .with_context(|| format!("Could not copy {} to {}", src.display(), dest.display()))?;

    Ok(())
}

/// Represents a row in the permutation results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PermutationRow {
    cbsa_id: RegionID,
    key: String,
    home_chg: u8,
    shift_h: f64,
    veh_kwh: f64,
    weight: u32,
    dcfc_per_day: f64,
    miles_per_day: f64,
    chg_time_per_dcfc: f64,
    seek_charge_kwh: f64,
    l2_max_kw: f64,
    sim_days: u32,
    plug_in_mins: f64,
    plug_occupied_time: f64,
    dcfc_kwh_per_day: f64,
    l2_kwh_per_day: f64,
    cbsa_whmi: f64,
    avg_speed_mph: f64,
}

impl PermutationRow {
    /// Create a new [`PermutationRow`]
    fn new(permutation: &Permutation) -> Self {
        Self {
            cbsa_id: permutation.region_id.clone(),
            key: permutation.key.clone(),
            home_chg: permutation.home_charging.into(),
            shift_h: permutation.shift_length.value(),
            veh_kwh: permutation.battery_capacity.value(),
            weight: permutation.weight,
            dcfc_per_day: permutation.fast_charges_per_day,
            miles_per_day: permutation.distance_per_day.value(),
            chg_time_per_dcfc: permutation.fast_charge_time.value(),
            seek_charge_kwh: permutation.seek_charge_energy.value(),
            l2_max_kw: permutation.home_charger_power.value(),
            sim_days: permutation.sim_days,
            plug_in_mins: permutation.plug_in_mins,
            plug_occupied_time: permutation.plug_occupied_time.value(),
            dcfc_kwh_per_day: permutation.fast_charge_energy_per_day.value(),
            l2_kwh_per_day: permutation.home_charge_energy_per_day.value(),
            cbsa_whmi: permutation.efficiency.wh_per_mile(),
            avg_speed_mph: permutation.avg_speed.value(),
        }
    }
}

/// Represents a row in the population results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PopulationRow {
    cbsa_id: RegionID,
    num_vehs: u32,
    num_dcfc_events: f64,
    cbsa_dcfc_hours: f64,
    cbsa_dcfc_plug_time: f64,
    cbsa_tnc_vmt: f64,
    cbsa_hc_access: u32,
    cbsa_avg_speed: f64,
    cbsa_whmi: f64,
    cbsa_dcfc_kwh_w_hc: f64,
    cbsa_dcfc_kwh_wo_hc: f64,
    cbsa_l2_kwh: f64,
    chargers: f64,
}

impl PopulationRow {
    /// Create a new [`PopulationRow`]
    fn new(result: &RegionResult) -> Self {
        let region = &result.region;
        let fleet = &result.fleet;
        Self {
            cbsa_id: region.id.clone(),
            num_vehs: fleet.vehicles,
            num_dcfc_events: fleet.fast_charges,
            cbsa_dcfc_hours: fleet.fast_charge_hours.value(),
            cbsa_dcfc_plug_time: fleet.plug_hours.value(),
            cbsa_tnc_vmt: region.travel_demand.value(),
            cbsa_hc_access: region.home_access_percent,
            cbsa_avg_speed: region.avg_speed.value(),
            cbsa_whmi: region.efficiency.wh_per_mile(),
            cbsa_dcfc_kwh_w_hc: fleet.fast_charge_energy_with_home.value(),
            cbsa_dcfc_kwh_wo_hc: fleet.fast_charge_energy_without_home.value(),
            cbsa_l2_kwh: fleet.home_charge_energy.value(),
            chargers: result.chargers,
        }
    }
}

/// Represents a row in the fast-charging profiles CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ChargeProfileRow {
    veh_kwh: f64,
    time_h: f64,
    power_kw: f64,
    soc: f64,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    charge_profiles_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            charge_profiles_writer: csv::Writer::from_path(
                output_path.join(CHARGE_PROFILES_FILE_NAME),
            )?,
        })
    }

    /// Write the course of fast charging for each battery size.
    ///
    /// Nothing is written for charges at constant power.
    fn write_charge_profiles(&mut self, charge_times: &ChargeTimeMap) -> Result<()> {
        for charge_time in charge_times.values() {
            let Some(profile) = &charge_time.profile else {
                continue;
            };

            for ((time, power), soc) in profile.time.iter().zip(&profile.power).zip(&profile.soc) {
                let row = ChargeProfileRow {
                    veh_kwh: charge_time.battery_capacity.value(),
                    time_h: time.value(),
                    power_kw: power.value(),
                    soc: soc.value(),
                };
                self.charge_profiles_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.charge_profiles_writer.flush()?;

        Ok(())
    }
}

/// An object for writing simulation results to file
pub struct DataWriter {
    permutations_writer: csv::Writer<File>,
    population_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            permutations_writer: new_writer(PERMUTATIONS_FILE_NAME)?,
            population_writer: new_writer(POPULATION_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write driver permutations to a CSV file
    pub fn write_permutations(&mut self, permutations: &[Permutation]) -> Result<()> {
        for permutation in permutations {
            self.permutations_writer
                .serialize(PermutationRow::new(permutation))?;
        }

        Ok(())
    }

    /// Write a region's fleet results to a CSV file
    pub fn write_population(&mut self, result: &RegionResult) -> Result<()> {
        self.population_writer
            .serialize(PopulationRow::new(result))?;

        Ok(())
    }

    /// Write fast-charging profiles to a CSV file, if debug info is enabled
    pub fn write_charge_profiles(&mut self, charge_times: &ChargeTimeMap) -> Result<()> {
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_charge_profiles(charge_times)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.permutations_writer.flush()?;
        self.population_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

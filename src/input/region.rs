//! Code for reading the regional reference tables from CSV files.
use super::*;
use crate::region::{RegionID, RegionInput, RegionMap, travel_demand};
use crate::units::{Miles, MilesPerHour};
use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;

const VMT_FILE_NAME: &str = "vmt_by_cbsa.csv";
const SPEED_FILE_NAME: &str = "median_mph_by_cbsa.csv";
const EFFICIENCY_FILE_NAME: &str = "whmi_by_cbsa.csv";
const HOME_ACCESS_FILE_NAME: &str = "overnight_chg_access_by_cbsa.csv";

/// The column of the home charging access table containing region IDs
const HOME_ACCESS_ID_COLUMN: &str = "cbsa_id";

/// Daily vehicle miles travelled in a region
#[derive(Debug, PartialEq, Deserialize)]
struct VmtRaw {
    cbsa_id: RegionID,
    cbsa_dvmt: Miles,
}

/// Median travel speed in a region
#[derive(Debug, PartialEq, Deserialize)]
struct SpeedRaw {
    geoid: RegionID,
    median_mph: f64,
}

/// Climate-related efficiency penalty for a region
#[derive(Debug, PartialEq, Deserialize)]
struct EfficiencyRaw {
    geoid: RegionID,
    penalty_factor: f64,
}

/// Read the regional reference tables and resolve the inputs for every region.
///
/// Regions are those listed in the VMT table, in file order. Every region must also appear in the
/// other tables.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `scenario` - The scenario parameters
///
/// # Returns
///
/// A map of [`RegionInput`]s or an error
pub fn read_regions(model_dir: &Path, scenario: &Scenario) -> Result<RegionMap> {
    let vmt = read_vmt(&model_dir.join(VMT_FILE_NAME))?;
    let speeds = read_speeds(&model_dir.join(SPEED_FILE_NAME))?;
    let penalties = read_penalties(&model_dir.join(EFFICIENCY_FILE_NAME))?;
    let home_access = read_home_access(
        &model_dir.join(HOME_ACCESS_FILE_NAME),
        &scenario.hc_scenario,
    )?;

    vmt.into_iter()
        .map(|(id, regional_vmt)| {
            let region = resolve_region(
                &id,
                regional_vmt,
                &speeds,
                &penalties,
                &home_access,
                scenario,
            )?;
            Ok((id, region))
        })
        .collect()
}

/// Combine the reference data for one region into a [`RegionInput`]
fn resolve_region(
    id: &RegionID,
    regional_vmt: Miles,
    speeds: &HashMap<RegionID, MilesPerHour>,
    penalties: &HashMap<RegionID, f64>,
    home_access: &HashMap<RegionID, f64>,
    scenario: &Scenario,
) -> Result<RegionInput> {
    let lookup = |file_name: &str| format!("Region {id} is missing from {file_name}");
    let avg_speed = *speeds.get(id).with_context(|| lookup(SPEED_FILE_NAME))?;
    let penalty = *penalties
        .get(id)
        .with_context(|| lookup(EFFICIENCY_FILE_NAME))?;
    let access = *home_access
        .get(id)
        .with_context(|| lookup(HOME_ACCESS_FILE_NAME))?;

    Ok(RegionInput {
        id: id.clone(),
        avg_speed,
        travel_demand: travel_demand(
            id,
            regional_vmt,
            scenario.tnc_share,
            scenario.deadhead_perc,
            scenario.vmt_override_flag,
        ),
        home_access_percent: (100.0 * access) as u32,
        efficiency: scenario.efficiency(penalty),
    })
}

/// Read the VMT table, preserving file order
fn read_vmt(file_path: &Path) -> Result<IndexMap<RegionID, Miles>> {
    let iter = read_csv::<VmtRaw>(file_path)?;
    read_vmt_from_iter(iter).with_context(|| input_err_msg(file_path))
}

fn read_vmt_from_iter<I>(iter: I) -> Result<IndexMap<RegionID, Miles>>
where
    I: Iterator<Item = VmtRaw>,
{
    let mut map = IndexMap::new();
    for row in iter {
        ensure!(
            row.cbsa_dvmt.is_finite() && row.cbsa_dvmt >= Miles(0.0),
            "Daily VMT for region {} must be a finite, non-negative number",
            row.cbsa_id
        );
        ensure!(
            map.insert(row.cbsa_id.clone(), row.cbsa_dvmt).is_none(),
            "Duplicate entry for region {}",
            row.cbsa_id
        );
    }

    Ok(map)
}

/// Read the median speed table
fn read_speeds(file_path: &Path) -> Result<HashMap<RegionID, MilesPerHour>> {
    let iter = read_csv::<SpeedRaw>(file_path)?;
    let speeds = collect_unique(iter.map(|row| (row.geoid, row.median_mph)), "median_mph")
        .with_context(|| input_err_msg(file_path))?;

    Ok(speeds
        .into_iter()
        .map(|(id, mph)| (id, MilesPerHour(mph)))
        .collect())
}

/// Read the efficiency penalty table
fn read_penalties(file_path: &Path) -> Result<HashMap<RegionID, f64>> {
    let iter = read_csv::<EfficiencyRaw>(file_path)?;
    collect_unique(
        iter.map(|row| (row.geoid, row.penalty_factor)),
        "penalty_factor",
    )
    .with_context(|| input_err_msg(file_path))
}

/// Collect `(region, value)` pairs, checking for duplicates and that values are positive
fn collect_unique<I>(iter: I, name: &str) -> Result<HashMap<RegionID, f64>>
where
    I: Iterator<Item = (RegionID, f64)>,
{
    let mut map = HashMap::new();
    for (id, value) in iter {
        check_positive(name, value).with_context(|| format!("Invalid value for region {id}"))?;
        ensure!(
            map.insert(id.clone(), value).is_none(),
            "Duplicate entry for region {id}"
        );
    }

    Ok(map)
}

/// Read the home charging access table.
///
/// The table has one column per home charging scenario, containing the fraction of drivers with
/// access to home charging. Only the column for the chosen scenario is read.
fn read_home_access(file_path: &Path, hc_scenario: &str) -> Result<HashMap<RegionID, f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;
    let headers = reader
        .headers()
        .with_context(|| input_err_msg(file_path))?
        .clone();
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| input_err_msg(file_path))?;

    read_home_access_from_records(&headers, &records, hc_scenario)
        .with_context(|| input_err_msg(file_path))
}

fn read_home_access_from_records(
    headers: &csv::StringRecord,
    records: &[csv::StringRecord],
    hc_scenario: &str,
) -> Result<HashMap<RegionID, f64>> {
    let find_column = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .with_context(|| format!("Missing column '{name}'"))
    };
    let id_column = find_column(HOME_ACCESS_ID_COLUMN)?;
    let value_column = find_column(hc_scenario)?;
    ensure!(!records.is_empty(), "CSV file cannot be empty");

    let mut map = HashMap::new();
    for record in records {
        let id: RegionID = record
            .get(id_column)
            .context("Missing region ID")?
            .into();
        let value: f64 = record
            .get(value_column)
            .with_context(|| format!("Missing value for region {id}"))?
            .parse()
            .with_context(|| format!("Invalid value for region {id}"))?;
        ensure!(
            (0.0..=1.0).contains(&value),
            "Home charging access for region {id} must be between 0 and 1"
        );
        ensure!(
            map.insert(id.clone(), value).is_none(),
            "Duplicate entry for region {id}"
        );
    }

    Ok(map)
}

//! Common routines for handling input data.
use crate::region::{RegionID, RegionMap, parse_region_str};
use crate::scenario::Scenario;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexSet;
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod power_curve;
use power_curve::read_power_curve;
pub mod region;
use region::read_regions;

pub use power_curve::PowerCurve;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

fn read_csv_internal<'a, T: DeserializeOwned + 'a>(file_path: &'a Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D, T>(deserialiser: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<f64>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?
    }

    Ok(value.into())
}

/// Read an f64, checking that it is a finite number greater than zero
pub fn deserialise_positive<'de, D, T>(deserialiser: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<f64>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(value.is_finite() && value > 0.0) {
        Err(serde::de::Error::custom(
            "Value must be a finite number greater than zero",
        ))?
    }

    Ok(value.into())
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check whether a slice is sorted in strictly ascending order
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.iter().tuple_windows().all(|(a, b)| a < b)
}

/// Check that a value is a finite number greater than zero
pub fn check_positive(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

/// Everything needed to run the simulation for a model directory
#[derive(Debug)]
pub struct Model {
    /// Scenario parameters
    pub scenario: Scenario,
    /// Resolved inputs for every region
    pub regions: RegionMap,
    /// The normalised charge-acceptance curve for fast charging
    pub power_curve: PowerCurve,
}

impl Model {
    /// Restrict the model to a subset of its regions.
    ///
    /// # Arguments
    ///
    /// * `regions` - "all" or a semicolon-separated list of region IDs
    pub fn select_regions(&mut self, regions: &str) -> Result<()> {
        let region_ids: IndexSet<RegionID> = self.regions.keys().cloned().collect();
        let selected = parse_region_str(regions, &region_ids)?;
        self.regions.retain(|id, _| selected.contains(id));

        Ok(())
    }
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing the scenario file and reference tables
///
/// # Returns
///
/// The scenario, regional inputs and power curve or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let scenario = Scenario::from_path(model_dir)?;
    let regions = read_regions(model_dir, &scenario)?;
    let power_curve = read_power_curve(model_dir)?;

    Ok(Model {
        scenario,
        regions,
        power_curve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{power_curve, region, scenario};
    use crate::region::RegionInput;
    use indexmap::indexmap;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> std::path::PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\nworld, 2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // File with no data rows
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"\nvalue = 1").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1,
            }
        );

        // Missing field
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"").unwrap();
        }
        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Proportion {
        #[serde(deserialize_with = "deserialise_proportion")]
        value: f64,
    }

    #[test]
    fn test_deserialise_proportion() {
        let parse = |s: &str| toml::from_str::<Proportion>(s).map(|p| p.value);
        assert_eq!(parse("value = 0.0").unwrap(), 0.0);
        assert_eq!(parse("value = 0.5").unwrap(), 0.5);
        assert_eq!(parse("value = 1.0").unwrap(), 1.0);
        assert!(parse("value = -0.1").is_err());
        assert!(parse("value = 1.1").is_err());
    }

    #[test]
    fn test_is_sorted_and_unique() {
        assert!(is_sorted_and_unique::<u32>(&[]));
        assert!(is_sorted_and_unique(&[1]));
        assert!(is_sorted_and_unique(&[1, 2, 3]));
        assert!(!is_sorted_and_unique(&[1, 1]));
        assert!(!is_sorted_and_unique(&[2, 1]));
    }

    #[rstest]
    fn test_select_regions(scenario: Scenario, power_curve: PowerCurve, region: RegionInput) {
        let mut other = region.clone();
        other.id = "10180".into();
        let mut model = Model {
            scenario,
            regions: indexmap! {
                region.id.clone() => region.clone(),
                other.id.clone() => other.clone(),
            },
            power_curve,
        };

        model.select_regions("all").unwrap();
        assert_eq!(model.regions.len(), 2);
        model.select_regions("10180").unwrap();
        assert_eq!(model.regions.keys().collect::<Vec<_>>(), [&other.id]);
        assert!(model.select_regions("41860").is_err());
    }
}

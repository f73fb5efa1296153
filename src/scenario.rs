//! Defines the [`Scenario`] struct, which represents the contents of `scenario.toml`.
use crate::input::{
    check_positive, deserialise_positive, deserialise_proportion, input_err_msg, read_toml,
};
use crate::units::{Dimensionless, Energy, EnergyPerMile, Hours, Power};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::de::{Deserialize, Deserializer, Error};
use std::path::{Path, PathBuf};

/// The name of the scenario file in a model directory
pub const SCENARIO_FILE_NAME: &str = "scenario.toml";

/// The seed used for sampling vehicle populations, unless one is given in the scenario file
const DEFAULT_SEED: u64 = 666;

/// The default root folder for output folders
const DEFAULT_OUTPUT_DIR: &str = "ridehail_evi_results";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_seed, u64, DEFAULT_SEED);
define_param_default!(default_output_dir, PathBuf, PathBuf::from(DEFAULT_OUTPUT_DIR));

/// An ordered mapping from category label to a weight.
///
/// Each label is parsed into a value (e.g. a shift length in hours). The weights do not need to
/// sum to any particular number: see [`Distribution::per_hundred`].
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution<T> {
    categories: IndexMap<String, (T, f64)>,
}

impl<T: Copy> Distribution<T> {
    /// Create a new distribution from `(label, value, weight)` triples.
    ///
    /// Weights must be finite and non-negative, and at least one must be greater than zero.
    pub fn new<I, S>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T, f64)>,
        S: Into<String>,
    {
        let mut categories = IndexMap::new();
        for (label, value, weight) in iter {
            let label = label.into();
            ensure!(
                weight.is_finite() && weight >= 0.0,
                "Weight for category '{label}' must be a finite, non-negative number"
            );
            ensure!(
                categories.insert(label.clone(), (value, weight)).is_none(),
                "Duplicate category '{label}'"
            );
        }

        let distribution = Self { categories };
        ensure!(
            distribution.total_weight() > 0.0,
            "Distribution must have at least one category with a non-zero weight"
        );

        Ok(distribution)
    }

    /// The sum of all weights
    pub fn total_weight(&self) -> f64 {
        self.categories.values().map(|(_, weight)| weight).sum()
    }

    /// Return a new distribution with the weights scaled to sum to 100
    pub fn per_hundred(&self) -> Self {
        let total = self.total_weight();
        let categories = self
            .categories
            .iter()
            .map(|(label, &(value, weight))| (label.clone(), (value, weight / total * 100.0)))
            .collect();

        Self { categories }
    }

    /// Iterate over the label, value and weight of each category, in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, T, f64)> + Clone {
        self.categories
            .iter()
            .map(|(label, &(value, weight))| (label.as_str(), value, weight))
    }
}

impl<'de, T> Deserialize<'de> for Distribution<T>
where
    T: Copy + From<f64>,
{
    fn deserialize<D>(deserialiser: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, f64>::deserialize(deserialiser)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (label, weight) in raw {
            let value: f64 = label
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("Invalid category '{label}'")))?;
            if !(value.is_finite() && value > 0.0) {
                Err(D::Error::custom(format!(
                    "Category '{label}' must be greater than zero"
                )))?
            }
            entries.push((label, T::from(value), weight));
        }

        Distribution::new(entries).map_err(|err| D::Error::custom(format!("{err:#}")))
    }
}

/// The parameters of a scenario, shared by all regions.
#[derive(Debug, serde::Deserialize, PartialEq)]
pub struct Scenario {
    /// The name of the scenario, used to name the output folder
    pub scenario_name: String,
    /// The share of regional vehicle miles travelled served by ride-hailing
    #[serde(deserialize_with = "deserialise_proportion")]
    pub tnc_share: Dimensionless,
    /// Extra miles driven without a passenger, as a fraction of passenger miles
    pub deadhead_perc: Dimensionless,
    /// The column of the home charging access table to use
    pub hc_scenario: String,
    /// Baseline vehicle efficiency in Wh/mile, before regional climate adjustment
    #[serde(deserialize_with = "deserialise_positive")]
    pub base_wh_mi: f64,
    /// Weights for shift lengths (hours)
    pub shift_length_dist: Distribution<Hours>,
    /// Weights for battery capacities (kWh)
    pub veh_kwh_dict: Distribution<Energy>,
    /// State of charge at which drivers seek a fast charge
    #[serde(deserialize_with = "deserialise_proportion")]
    pub soc_low: Dimensionless,
    /// State of charge at which fast charging ends
    #[serde(deserialize_with = "deserialise_proportion")]
    pub soc_high: Dimensionless,
    /// State of charge at the start of the first shift
    #[serde(deserialize_with = "deserialise_proportion")]
    pub initial_soc: Dimensionless,
    /// Whether fast charging follows the power curve (otherwise constant power)
    pub charge_taper: bool,
    /// Maximum power of a fast charger
    #[serde(deserialize_with = "deserialise_positive")]
    pub dcfc_max_kw: Power,
    /// Maximum power a vehicle can accept when fast charging.
    ///
    /// Defaults to the fast charger limit.
    #[serde(default)]
    pub veh_max_kw: Option<Power>,
    /// Time spent connecting to a fast charger, in minutes
    pub plug_in_mins: f64,
    /// Maximum power of a home (L2) charger
    #[serde(deserialize_with = "deserialise_positive")]
    pub l2_max_kw: Power,
    /// Number of days to simulate each vehicle for
    pub sim_days: u32,
    /// Fraction of the day a fast charger is expected to be in use
    #[serde(deserialize_with = "deserialise_proportion")]
    pub utilization_perc: Dimensionless,
    /// Whether to use the calibrated ride-hailing shares for the largest regions
    pub vmt_override_flag: bool,
    /// Root folder for output folders
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Seed for the random number generator used to sample vehicle populations
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Scenario {
    /// Read a scenario file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The file contents as a [`Scenario`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Scenario> {
        let file_path = model_dir.as_ref().join(SCENARIO_FILE_NAME);
        let scenario: Scenario = read_toml(&file_path)?;

        scenario
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(scenario)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.scenario_name.trim().is_empty(),
            "scenario_name cannot be empty"
        );
        ensure!(
            self.deadhead_perc.is_finite() && self.deadhead_perc >= Dimensionless(0.0),
            "deadhead_perc must be a finite, non-negative number"
        );
        ensure!(
            self.soc_low < self.soc_high,
            "soc_low must be less than soc_high"
        );
        if let Some(veh_max_kw) = self.veh_max_kw {
            check_positive("veh_max_kw", veh_max_kw.value())?;
        }
        ensure!(
            self.plug_in_mins.is_finite() && self.plug_in_mins >= 0.0,
            "plug_in_mins must be a finite, non-negative number"
        );
        ensure!(self.sim_days > 0, "sim_days cannot be zero");
        ensure!(
            self.utilization_perc > Dimensionless(0.0),
            "utilization_perc must be greater than zero"
        );
        check_shift_lengths(&self.shift_length_dist)?;

        Ok(())
    }

    /// The maximum power a vehicle accepts when fast charging
    pub fn vehicle_max_power(&self) -> Power {
        self.veh_max_kw.unwrap_or(self.dcfc_max_kw)
    }

    /// Time taken to connect to a fast charger
    pub fn plug_in_time(&self) -> Hours {
        Hours::from_minutes(self.plug_in_mins)
    }

    /// The vehicle efficiency for a region with the given climate penalty factor
    pub fn efficiency(&self, penalty_factor: f64) -> EnergyPerMile {
        EnergyPerMile::from_wh_per_mile(penalty_factor * self.base_wh_mi)
    }

    /// Iterate over the scenario values as `(name, value)` pairs, for logging
    pub fn iter_values(&self) -> impl Iterator<Item = (&'static str, String)> {
        [
            ("scenario_name", self.scenario_name.clone()),
            ("tnc_share", self.tnc_share.to_string()),
            ("deadhead_perc", self.deadhead_perc.to_string()),
            ("hc_scenario", self.hc_scenario.clone()),
            ("base_wh_mi", self.base_wh_mi.to_string()),
            ("shift_length_dist", format_distribution(&self.shift_length_dist)),
            ("veh_kwh_dict", format_distribution(&self.veh_kwh_dict)),
            ("soc_low", self.soc_low.to_string()),
            ("soc_high", self.soc_high.to_string()),
            ("initial_soc", self.initial_soc.to_string()),
            ("charge_taper", self.charge_taper.to_string()),
            ("dcfc_max_kw", self.dcfc_max_kw.to_string()),
            ("veh_max_kw", self.vehicle_max_power().to_string()),
            ("plug_in_mins", self.plug_in_mins.to_string()),
            ("l2_max_kw", self.l2_max_kw.to_string()),
            ("sim_days", self.sim_days.to_string()),
            ("utilization_perc", self.utilization_perc.to_string()),
            ("vmt_override_flag", self.vmt_override_flag.to_string()),
            ("output_dir", self.output_dir.display().to_string()),
            ("seed", self.seed.to_string()),
        ]
        .into_iter()
    }
}

/// Format a distribution as a comma-separated list of `label: weight` pairs
fn format_distribution<T: Copy>(dist: &Distribution<T>) -> String {
    dist.iter()
        .map(|(label, _, weight)| format!("{label}: {weight}"))
        .join(", ")
}

/// Check that every shift leaves some time in the day for the vehicle to rest
fn check_shift_lengths(dist: &Distribution<Hours>) -> Result<()> {
    for (label, shift_length, _) in dist.iter() {
        ensure!(
            shift_length < Hours(24.0),
            "Shift length '{label}' must be less than 24 hours"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, scenario};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const SCENARIO_TOML: &str = r#"
scenario_name = "baseline"
tnc_share = 0.01
deadhead_perc = 0.4
hc_scenario = "hc_access_mid"
base_wh_mi = 300
soc_low = 0.2
soc_high = 0.8
initial_soc = 1.0
charge_taper = true
dcfc_max_kw = 150
plug_in_mins = 5
l2_max_kw = 7.2
sim_days = 7
utilization_perc = 0.3
vmt_override_flag = false

[shift_length_dist]
4 = 25
8 = 50
12 = 25

[veh_kwh_dict]
60 = 1
100 = 3
"#;

    #[test]
    fn test_scenario_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(SCENARIO_FILE_NAME)).unwrap();
            write!(file, "{SCENARIO_TOML}").unwrap();
        }

        let scenario = Scenario::from_path(dir.path()).unwrap();
        assert_eq!(scenario.scenario_name, "baseline");
        assert_eq!(scenario.seed, DEFAULT_SEED);
        assert_eq!(scenario.vehicle_max_power(), Power(150.0));
        assert_eq!(scenario.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        let shifts: Vec<_> = scenario.shift_length_dist.iter().collect();
        assert_eq!(
            shifts,
            [("4", Hours(4.0), 25.0), ("8", Hours(8.0), 50.0), ("12", Hours(12.0), 25.0)]
        );
        let batteries: Vec<_> = scenario.veh_kwh_dict.iter().map(|(_, v, _)| v).collect();
        assert_eq!(batteries, [Energy(60.0), Energy(100.0)]);
    }

    #[test]
    fn test_scenario_from_path_invalid() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(SCENARIO_FILE_NAME)).unwrap();
            write!(file, "{}", SCENARIO_TOML.replace("sim_days = 7", "sim_days = 0")).unwrap();
        }

        let result = Scenario::from_path(dir.path());
        assert_eq!(
            result.unwrap_err().root_cause().to_string(),
            "sim_days cannot be zero"
        );
    }

    #[rstest]
    fn test_validate_soc_thresholds(mut scenario: Scenario) {
        assert!(scenario.validate().is_ok());
        scenario.soc_low = Dimensionless(0.8);
        assert_error!(scenario.validate(), "soc_low must be less than soc_high");
    }

    #[rstest]
    fn test_validate_shift_too_long(mut scenario: Scenario) {
        scenario.shift_length_dist = Distribution::new([("24", Hours(24.0), 1.0)]).unwrap();
        assert_error!(
            scenario.validate(),
            "Shift length '24' must be less than 24 hours"
        );
    }

    #[rstest]
    fn test_efficiency(scenario: Scenario) {
        assert_approx_eq!(f64, scenario.efficiency(1.1).wh_per_mile(), 330.0);
    }

    #[test]
    fn test_distribution_per_hundred() {
        let dist = Distribution::new([("a", 1.0, 1.0), ("b", 2.0, 3.0)]).unwrap();
        let scaled = dist.per_hundred();
        let weights: Vec<_> = scaled.iter().map(|(_, _, w)| w).collect();
        assert_eq!(weights, [25.0, 75.0]);
        assert_approx_eq!(f64, scaled.total_weight(), 100.0);

        // The original is unchanged
        assert_eq!(dist.total_weight(), 4.0);
    }

    #[rstest]
    #[case(&[("a", 1.0, 0.0)], "Distribution must have at least one category with a non-zero weight")]
    #[case(&[("a", 1.0, -1.0)], "Weight for category 'a' must be a finite, non-negative number")]
    #[case(&[("a", 1.0, 1.0), ("a", 2.0, 1.0)], "Duplicate category 'a'")]
    fn test_distribution_invalid(#[case] entries: &[(&str, f64, f64)], #[case] msg: &str) {
        assert_error!(Distribution::new(entries.iter().copied()), msg);
    }

    #[test]
    fn test_distribution_deserialise_bad_label() {
        #[derive(Debug, serde::Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            dist: Distribution<Hours>,
        }

        assert!(toml::from_str::<Wrapper>("[dist]\neight = 1").is_err());
        assert!(toml::from_str::<Wrapper>("[dist]\n0 = 1").is_err());
        assert!(toml::from_str::<Wrapper>("[dist]\n8 = 1").is_ok());
    }
}

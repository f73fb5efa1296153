//! Regions are the metropolitan areas (CBSAs) for which charging needs are estimated.
use crate::id::{IDCollection, define_id_type};
use crate::units::{Dimensionless, EnergyPerMile, Miles, MilesPerHour};
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};

define_id_type! {RegionID}

/// A map of [`RegionInput`]s, keyed by region ID
pub type RegionMap = IndexMap<RegionID, RegionInput>;

/// Calibrated ride-hailing shares of regional vehicle miles travelled for the largest regions.
///
/// These replace the scenario-wide share when the scenario's `vmt_override_flag` is set.
const TRAVEL_DEMAND_SHARE_OVERRIDES: [(&str, f64); 6] = [
    ("31080", 1.5 / 100.0), // Los Angeles
    ("42660", 1.9 / 100.0), // Seattle
    ("41860", 2.7 / 100.0), // San Francisco
    ("47900", 1.9 / 100.0), // Washington, DC
    ("14460", 1.9 / 100.0), // Boston
    ("16980", 2.1 / 100.0), // Chicago
];

/// The inputs describing a single region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionInput {
    /// The region's CBSA code (e.g. "31080")
    pub id: RegionID,
    /// Median travel speed
    pub avg_speed: MilesPerHour,
    /// Daily ride-hailing miles travelled which must be served by the fleet
    pub travel_demand: Miles,
    /// Percentage of drivers with access to overnight charging at home
    pub home_access_percent: u32,
    /// Vehicle efficiency, including the regional climate penalty
    pub efficiency: EnergyPerMile,
}

/// Get the calibrated ride-hailing share for a region, if there is one
pub fn travel_demand_share_override(region_id: &RegionID) -> Option<Dimensionless> {
    TRAVEL_DEMAND_SHARE_OVERRIDES
        .iter()
        .find(|(id, _)| *id == region_id.as_str())
        .map(|(_, share)| Dimensionless(*share))
}

/// Calculate the daily ride-hailing miles to be served in a region.
///
/// # Arguments
///
/// * `region_id` - The region
/// * `regional_vmt` - Total daily vehicle miles travelled in the region
/// * `tnc_share` - Scenario-wide ride-hailing share of regional miles
/// * `deadhead` - Extra miles driven without passengers, as a fraction of passenger miles
/// * `use_override` - Whether to use the calibrated share for this region, if there is one
pub fn travel_demand(
    region_id: &RegionID,
    regional_vmt: Miles,
    tnc_share: Dimensionless,
    deadhead: Dimensionless,
    use_override: bool,
) -> Miles {
    let with_deadhead = regional_vmt * (Dimensionless(1.0) + deadhead);
    let share = use_override
        .then(|| travel_demand_share_override(region_id))
        .flatten()
        .unwrap_or(tnc_share);

    with_deadhead * share
}

/// Parse a string of regions separated by semicolons into a set of [`RegionID`]s.
///
/// The string can be either "all" (case-insensitive), a single region, or a semicolon-separated
/// list of regions (e.g. "31080;41860" or "31080; 41860")
pub fn parse_region_str(s: &str, region_ids: &IndexSet<RegionID>) -> Result<IndexSet<RegionID>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No regions provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(region_ids.clone());
    }

    s.split(';')
        .map(|y| region_ids.get_id_by_str(y.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case("31080", false, 1000.0 * 1.4 * 0.01)]
    #[case("31080", true, 1000.0 * 1.4 * 0.015)]
    #[case("41860", true, 1000.0 * 1.4 * 0.027)]
    #[case("12345", true, 1000.0 * 1.4 * 0.01)]
    fn test_travel_demand(#[case] id: &str, #[case] use_override: bool, #[case] expected: f64) {
        let demand = travel_demand(
            &id.into(),
            Miles(1000.0),
            Dimensionless(0.01),
            Dimensionless(0.4),
            use_override,
        );
        assert_approx_eq!(f64, demand.value(), expected);
    }

    #[test]
    fn test_travel_demand_share_override() {
        assert_eq!(
            travel_demand_share_override(&"16980".into()),
            Some(Dimensionless(2.1 / 100.0))
        );
        assert_eq!(travel_demand_share_override(&"10180".into()), None);
    }

    #[test]
    fn test_parse_region_str() {
        let region_ids: IndexSet<RegionID> = ["31080".into(), "41860".into(), "16980".into()]
            .into_iter()
            .collect();

        assert_eq!(parse_region_str("ALL", &region_ids).unwrap(), region_ids);
        let selected = parse_region_str("41860; 31080", &region_ids).unwrap();
        assert_eq!(
            selected.into_iter().collect::<Vec<_>>(),
            [RegionID::new("41860"), RegionID::new("31080")]
        );
        assert_error!(parse_region_str(" ", &region_ids), "No regions provided");
        assert!(parse_region_str("99999", &region_ids).is_err());
    }
}

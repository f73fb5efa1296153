//! Fixtures for tests
use crate::input::PowerCurve;
use crate::region::RegionInput;
use crate::scenario::{Distribution, Scenario};
use crate::simulation::charging::{ChargeTimeMap, calc_charge_times};
use crate::simulation::permutation::Permutation;
use crate::simulation::vehicle::VehicleParams;
use crate::units::{Dimensionless, Energy, EnergyPerMile, Hours, Miles, MilesPerHour, Power};
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn scenario() -> Scenario {
    Scenario {
        scenario_name: "baseline".into(),
        tnc_share: Dimensionless(0.01),
        deadhead_perc: Dimensionless(0.4),
        hc_scenario: "hc_access_mid".into(),
        base_wh_mi: 300.0,
        shift_length_dist: Distribution::new([
            ("4", Hours(4.0), 25.0),
            ("8", Hours(8.0), 50.0),
            ("12", Hours(12.0), 25.0),
        ])
        .unwrap(),
        veh_kwh_dict: Distribution::new([("60", Energy(60.0), 1.0), ("100", Energy(100.0), 3.0)])
            .unwrap(),
        soc_low: Dimensionless(0.2),
        soc_high: Dimensionless(0.8),
        initial_soc: Dimensionless(1.0),
        charge_taper: true,
        dcfc_max_kw: Power(150.0),
        veh_max_kw: None,
        plug_in_mins: 5.0,
        l2_max_kw: Power(7.2),
        sim_days: 7,
        utilization_perc: Dimensionless(0.3),
        vmt_override_flag: false,
        output_dir: PathBuf::from("ridehail_evi_results"),
        seed: 666,
    }
}

/// A curve which tapers above 80% state of charge
#[fixture]
pub fn power_curve() -> PowerCurve {
    PowerCurve::new([(0.0, 0.5), (0.5, 1.0), (0.8, 1.0), (1.0, 0.2)]).unwrap()
}

#[fixture]
pub fn region() -> RegionInput {
    RegionInput {
        id: "41860".into(),
        avg_speed: MilesPerHour(20.0),
        travel_demand: Miles(1000.0),
        home_access_percent: 45,
        efficiency: EnergyPerMile(0.3),
    }
}

#[fixture]
pub fn charge_times(scenario: Scenario, power_curve: PowerCurve) -> ChargeTimeMap {
    calc_charge_times(&scenario, &power_curve).unwrap()
}

/// A 100 kWh vehicle driving 20 mph for 8 hours a day, with no home charging
#[fixture]
pub fn vehicle_params() -> VehicleParams {
    VehicleParams {
        battery_capacity: Energy(100.0),
        home_charging: false,
        shift_length: Hours(8.0),
        avg_speed: MilesPerHour(20.0),
        efficiency: EnergyPerMile(0.3),
        seek_charge_energy: Energy(20.0),
        fast_charge_duration: Hours(0.5),
        fast_charge_target: Dimensionless(0.8),
        home_charger_power: Power(10.0),
    }
}

/// A driver permutation covering 200 miles a day
#[fixture]
pub fn permutation(region: RegionInput) -> Permutation {
    Permutation {
        region_id: region.id,
        key: "0_8_100".into(),
        home_charging: false,
        shift_length: Hours(8.0),
        battery_capacity: Energy(100.0),
        weight: 10,
        fast_charges_per_day: 1.5,
        distance_per_day: Miles(200.0),
        fast_charge_time: Hours(0.5),
        seek_charge_energy: Energy(20.0),
        home_charger_power: Power(7.2),
        sim_days: 7,
        plug_in_mins: 5.0,
        plug_occupied_time: Hours(0.5) + Hours::from_minutes(5.0),
        fast_charge_energy_per_day: Energy(90.0),
        home_charge_energy_per_day: Energy(0.0),
        efficiency: region.efficiency,
        avg_speed: region.avg_speed,
    }
}

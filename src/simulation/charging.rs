//! Calculation of fast-charging durations.
use crate::input::PowerCurve;
use crate::scenario::Scenario;
use crate::units::{Dimensionless, Energy, Hours, Power};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::debug;

/// The time step used when integrating the power curve, in seconds
const TIME_STEP_SECONDS: f64 = 60.0;

/// The longest a single fast charge may take
const MAX_CHARGE_DURATION: Hours = Hours(24.0);

/// The power limits of a fast-charging session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeLimits {
    /// Battery capacity
    pub battery_capacity: Energy,
    /// The maximum power the vehicle can accept
    pub vehicle_max_power: Power,
    /// The maximum power the charger can provide
    pub charger_max_power: Power,
}

/// The course of a fast-charging session
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeProfile {
    /// Total time taken to charge
    pub duration: Hours,
    /// Elapsed time at each step, starting at zero
    pub time: Vec<Hours>,
    /// Charging power during the step ending at each time (zero for the first entry)
    pub power: Vec<Power>,
    /// State of charge at each time
    pub soc: Vec<Dimensionless>,
}

/// Calculate the time taken to fast charge between two states of charge, following a power curve.
///
/// Charging is simulated with a fixed time step. At each step the power is the lesser of the
/// power the vehicle accepts at the current state of charge and the charger's maximum.
///
/// # Arguments
///
/// * `limits` - Battery capacity and power limits
/// * `soc_low` - State of charge at the start of the session
/// * `soc_high` - State of charge at which charging stops
/// * `curve` - Relative power accepted by the vehicle as a function of state of charge
pub fn calc_charge_profile(
    limits: &ChargeLimits,
    soc_low: Dimensionless,
    soc_high: Dimensionless,
    curve: &PowerCurve,
) -> Result<ChargeProfile> {
    let step = Hours::from_seconds(TIME_STEP_SECONDS);
    let mut energy = soc_low * limits.battery_capacity;
    let mut soc = soc_low;
    let mut steps = 0u32;
    let mut time = vec![Hours(0.0)];
    let mut power = vec![Power(0.0)];
    let mut socs = vec![soc];

    while soc < soc_high {
        let accepted = curve.relative_power(soc)? * limits.vehicle_max_power;
        let step_power = accepted.min(limits.charger_max_power);
        ensure!(
            step_power > Power(0.0),
            "Charging stalled at state of charge {soc}: no power is accepted"
        );

        energy += step_power * step;
        let new_soc = energy / limits.battery_capacity;
        ensure!(
            new_soc > soc,
            "Charging stalled at state of charge {soc}: power is too low to raise it"
        );
        soc = new_soc;
        steps += 1;
        ensure!(
            Hours::from_seconds(f64::from(steps) * TIME_STEP_SECONDS) <= MAX_CHARGE_DURATION,
            "Charging from {soc_low} to {soc_high} takes longer than {MAX_CHARGE_DURATION} hours"
        );

        time.push(Hours::from_seconds(f64::from(steps) * TIME_STEP_SECONDS));
        power.push(step_power);
        socs.push(soc);
    }

    Ok(ChargeProfile {
        duration: Hours::from_seconds(f64::from(steps) * TIME_STEP_SECONDS),
        time,
        power,
        soc: socs,
    })
}

/// Calculate the time taken to charge between two states of charge at a constant power
pub fn constant_power_charge_time(
    battery_capacity: Energy,
    charger_power: Power,
    soc_low: Dimensionless,
    soc_high: Dimensionless,
) -> Hours {
    ((soc_high - soc_low) * battery_capacity) / charger_power
}

/// The time taken to fast charge a battery of a particular size
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeTime {
    /// Battery capacity
    pub battery_capacity: Energy,
    /// Time spent charging, not including plugging in
    pub duration: Hours,
    /// The course of the charge, if charging follows the power curve
    pub profile: Option<ChargeProfile>,
}

/// Fast-charging times, keyed by the battery size label used in the scenario
pub type ChargeTimeMap = IndexMap<String, ChargeTime>;

/// Calculate the time taken to fast charge each of the scenario's battery sizes.
///
/// Charging runs from `soc_low` to `soc_high`. If `charge_taper` is set, charging follows the
/// power curve, otherwise the charger's maximum power is used throughout.
pub fn calc_charge_times(scenario: &Scenario, curve: &PowerCurve) -> Result<ChargeTimeMap> {
    scenario
        .veh_kwh_dict
        .iter()
        .map(|(label, battery_capacity, _)| {
            let charge_time = if scenario.charge_taper {
                let limits = ChargeLimits {
                    battery_capacity,
                    vehicle_max_power: scenario.vehicle_max_power(),
                    charger_max_power: scenario.dcfc_max_kw,
                };
                let profile =
                    calc_charge_profile(&limits, scenario.soc_low, scenario.soc_high, curve)
                        .with_context(|| {
                            format!("Could not calculate charging time for {label} kWh battery")
                        })?;
                ChargeTime {
                    battery_capacity,
                    duration: profile.duration,
                    profile: Some(profile),
                }
            } else {
                ChargeTime {
                    battery_capacity,
                    duration: constant_power_charge_time(
                        battery_capacity,
                        scenario.dcfc_max_kw,
                        scenario.soc_low,
                        scenario.soc_high,
                    ),
                    profile: None,
                }
            };
            debug!(
                "Fast charging a {label} kWh battery takes {} hours",
                charge_time.duration
            );

            Ok((label.to_string(), charge_time))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, power_curve, scenario};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn limits(charger_max_power: f64) -> ChargeLimits {
        ChargeLimits {
            battery_capacity: Energy(60.0),
            vehicle_max_power: Power(150.0),
            charger_max_power: Power(charger_max_power),
        }
    }

    #[test]
    fn test_constant_power_charge_time() {
        let duration = constant_power_charge_time(
            Energy(60.0),
            Power(150.0),
            Dimensionless(0.2),
            Dimensionless(0.8),
        );
        assert_eq!(duration, Hours((0.8 - 0.2) * 60.0 / 150.0));
        assert_approx_eq!(f64, duration.value(), 0.24);
    }

    #[test]
    fn test_calc_charge_profile_flat_curve() {
        // With a flat curve, 60 kW into a 60 kWh battery adds 1/60 state of charge per minute
        let curve = PowerCurve::new([(0.0, 1.0), (1.0, 1.0)]).unwrap();
        let limits = ChargeLimits {
            battery_capacity: Energy(60.0),
            vehicle_max_power: Power(60.0),
            charger_max_power: Power(150.0),
        };
        let profile =
            calc_charge_profile(&limits, Dimensionless(0.2), Dimensionless(0.5), &curve).unwrap();

        // 18 minutes, allowing for one extra step from rounding
        let minutes = profile.duration.value() * 60.0;
        assert!((18.0..=19.0).contains(&minutes), "took {minutes} minutes");
        assert_eq!(profile.time.len(), profile.soc.len());
        assert_eq!(profile.time.len(), profile.power.len());
        assert_eq!(*profile.time.last().unwrap(), profile.duration);
        assert!(*profile.soc.last().unwrap() >= Dimensionless(0.5));
        assert!(profile.power[1..].iter().all(|&p| p == Power(60.0)));
    }

    #[rstest]
    fn test_calc_charge_profile_charger_bottleneck(power_curve: PowerCurve) {
        // The charger limit is below everything the vehicle accepts
        let profile =
            calc_charge_profile(&limits(20.0), Dimensionless(0.2), Dimensionless(0.8), &power_curve)
                .unwrap();
        assert!(profile.power[1..].iter().all(|&p| p == Power(20.0)));
    }

    #[rstest]
    fn test_calc_charge_profile_soc_non_decreasing(power_curve: PowerCurve) {
        let profile = calc_charge_profile(
            &limits(150.0),
            Dimensionless(0.1),
            Dimensionless(0.95),
            &power_curve,
        )
        .unwrap();
        assert!(profile.soc.windows(2).all(|w| w[0] <= w[1]));
        assert!(profile.time.windows(2).all(|w| w[0] < w[1]));
    }

    #[rstest]
    #[case(0.8, 0.8)]
    #[case(0.9, 0.5)]
    fn test_calc_charge_profile_no_charge_needed(
        power_curve: PowerCurve,
        #[case] soc_low: f64,
        #[case] soc_high: f64,
    ) {
        let profile = calc_charge_profile(
            &limits(150.0),
            Dimensionless(soc_low),
            Dimensionless(soc_high),
            &power_curve,
        )
        .unwrap();
        assert_eq!(profile.duration, Hours(0.0));
        assert_eq!(profile.soc, [Dimensionless(soc_low)]);
    }

    #[rstest]
    fn test_calc_charge_profile_monotonic_in_soc_range(power_curve: PowerCurve) {
        let durations: Vec<_> = [0.3, 0.5, 0.7, 0.9]
            .into_iter()
            .map(|soc_high| {
                calc_charge_profile(
                    &limits(150.0),
                    Dimensionless(0.2),
                    Dimensionless(soc_high),
                    &power_curve,
                )
                .unwrap()
                .duration
            })
            .collect();
        assert!(durations.windows(2).all(|w| w[0] <= w[1]));
    }

    #[rstest]
    fn test_calc_charge_profile_monotonic_in_charger_power(power_curve: PowerCurve) {
        let durations: Vec<_> = [25.0, 50.0, 100.0, 150.0, 350.0]
            .into_iter()
            .map(|charger_power| {
                calc_charge_profile(
                    &limits(charger_power),
                    Dimensionless(0.2),
                    Dimensionless(0.8),
                    &power_curve,
                )
                .unwrap()
                .duration
            })
            .collect();
        assert!(durations.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_calc_charge_profile_stalled() {
        let curve = PowerCurve::new([(0.0, 1.0), (0.5, 0.0), (1.0, 0.0)]).unwrap();
        let result = calc_charge_profile(
            &limits(150.0),
            Dimensionless(0.5),
            Dimensionless(0.8),
            &curve,
        );
        assert_error!(
            result,
            "Charging stalled at state of charge 0.5: no power is accepted"
        );
    }

    #[test]
    fn test_calc_charge_profile_tapers_to_zero() {
        // Power falls towards zero as the battery fills, so it never reaches full charge
        let curve = PowerCurve::new([(0.0, 1.0), (1.0, 0.0)]).unwrap();
        let result = calc_charge_profile(
            &limits(150.0),
            Dimensionless(0.2),
            Dimensionless(1.0),
            &curve,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_calc_charge_profile_too_slow() {
        // 36 kWh at 0.15 kW would take 240 hours
        let curve = PowerCurve::new([(0.0, 0.001), (1.0, 0.001)]).unwrap();
        let result = calc_charge_profile(
            &limits(150.0),
            Dimensionless(0.2),
            Dimensionless(0.8),
            &curve,
        );
        assert_error!(
            result,
            "Charging from 0.2 to 0.8 takes longer than 24 hours"
        );
    }

    #[rstest]
    fn test_calc_charge_times_constant_power(mut scenario: Scenario, power_curve: PowerCurve) {
        scenario.charge_taper = false;
        let times = calc_charge_times(&scenario, &power_curve).unwrap();

        assert_eq!(times.keys().collect::<Vec<_>>(), ["60", "100"]);
        assert_approx_eq!(f64, times["60"].duration.value(), 0.24);
        assert_approx_eq!(f64, times["100"].duration.value(), 0.4);
        assert!(times.values().all(|time| time.profile.is_none()));
    }

    #[rstest]
    fn test_calc_charge_times_taper(scenario: Scenario, power_curve: PowerCurve) {
        let times = calc_charge_times(&scenario, &power_curve).unwrap();

        // The vehicle never accepts more than the charger limit, so tapering can only slow things
        for time in times.values() {
            let constant = constant_power_charge_time(
                time.battery_capacity,
                scenario.dcfc_max_kw,
                scenario.soc_low,
                scenario.soc_high,
            );
            assert!(time.duration >= constant);
            assert_eq!(time.profile.as_ref().unwrap().duration, time.duration);
        }
    }
}

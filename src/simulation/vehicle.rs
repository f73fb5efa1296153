//! Simulation of a single vehicle over several days of shifts.
//!
//! During a shift the vehicle drives at the region's average speed, stopping to fast charge
//! whenever its battery falls to the level at which the driver seeks a charge. Between shifts the
//! vehicle is charged at home if the driver has access to a home charger.
use crate::units::{Dimensionless, Energy, EnergyPerMile, Hours, Miles, MilesPerHour, Power};
use anyhow::{Result, ensure};

/// Hours in a day
const HOURS_PER_DAY: Hours = Hours(24.0);

/// Fraction of the energy drawn from a home charger which ends up in the battery
const HOME_CHARGING_EFFICIENCY: Dimensionless = Dimensionless(0.9);

/// The fixed characteristics of a simulated vehicle and its driver
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleParams {
    /// Battery capacity
    pub battery_capacity: Energy,
    /// Whether the driver can charge at home overnight
    pub home_charging: bool,
    /// Nominal length of a shift
    pub shift_length: Hours,
    /// Average driving speed
    pub avg_speed: MilesPerHour,
    /// Energy used per mile driven
    pub efficiency: EnergyPerMile,
    /// Energy left in the battery when the driver seeks a fast charge
    pub seek_charge_energy: Energy,
    /// Time taken by each fast-charging stop, including plugging in
    pub fast_charge_duration: Hours,
    /// State of charge at the end of a fast charge
    pub fast_charge_target: Dimensionless,
    /// Maximum power of the home charger
    pub home_charger_power: Power,
}

impl VehicleParams {
    /// Energy added to the battery by each fast charge
    pub fn fast_charge_energy(&self) -> Energy {
        self.battery_capacity * self.fast_charge_target - self.seek_charge_energy
    }
}

/// The state of charge of a vehicle over time.
///
/// Times are absolute, measured from the start of the first shift, and never decrease.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleTrace {
    time: Vec<Hours>,
    soc: Vec<Dimensionless>,
}

impl VehicleTrace {
    /// Start a new trace at time zero with the given state of charge
    pub fn new(initial_soc: Dimensionless) -> Self {
        Self {
            time: vec![Hours(0.0)],
            soc: vec![initial_soc],
        }
    }

    /// Record the state of charge at a time
    fn push(&mut self, time: Hours, soc: Dimensionless) {
        debug_assert!(time >= self.last_time());
        self.time.push(time);
        self.soc.push(soc);
    }

    /// The most recently recorded time
    pub fn last_time(&self) -> Hours {
        *self.time.last().unwrap()
    }

    /// The most recently recorded state of charge
    pub fn last_soc(&self) -> Dimensionless {
        *self.soc.last().unwrap()
    }

    /// Iterate over `(time, state of charge)` samples
    pub fn iter(&self) -> impl Iterator<Item = (Hours, Dimensionless)> + '_ {
        self.time.iter().copied().zip(self.soc.iter().copied())
    }
}

/// The outcome of a single shift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftOutcome {
    /// Number of fast charges during the shift
    pub fast_charges: u32,
    /// How long the shift overran because a fast charge was in progress at its end
    pub spillover: Hours,
    /// Distance driven
    pub distance: Miles,
}

/// The outcome of a night between shifts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NightOutcome {
    /// The time at which the next shift starts
    pub next_shift_start: Hours,
    /// Energy added to the battery by home charging
    pub home_charge_energy: Energy,
}

/// The totals for a vehicle simulated over several days
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRun {
    /// The vehicle's state of charge over time
    pub trace: VehicleTrace,
    /// Total number of fast charges
    pub fast_charges: u32,
    /// Total distance driven
    pub distance: Miles,
    /// Total energy added by fast charging
    pub fast_charge_energy: Energy,
    /// Total energy added by home charging
    pub home_charge_energy: Energy,
}

/// Simulate a single shift.
///
/// The vehicle drives until its battery reaches the level at which the driver seeks a fast charge,
/// charges to the target state of charge and carries on, until the shift is over. A fast charge
/// which is in progress at the end of the shift runs to completion, making the shift overrun.
///
/// # Arguments
///
/// * `trace` - The vehicle's state of charge over time, which is extended for this shift
/// * `params` - The vehicle's characteristics
/// * `shift_start` - The time at which the shift starts
pub fn simulate_day(
    trace: &mut VehicleTrace,
    params: &VehicleParams,
    shift_start: Hours,
) -> ShiftOutcome {
    let capacity = params.battery_capacity;
    let mut energy = trace.last_soc() * capacity;
    let mut remaining = params.shift_length;
    let mut elapsed = Hours(0.0);
    let mut distance = Miles(0.0);
    let mut fast_charges = 0;

    while remaining > Hours(0.0) {
        let energy_needed = params.avg_speed * remaining * params.efficiency;
        let available = energy - params.seek_charge_energy;

        if available > energy_needed {
            // Enough energy to finish the shift without charging
            energy -= energy_needed;
            distance += params.avg_speed * remaining;
            elapsed = params.shift_length;
            remaining = Hours(0.0);
            trace.push(shift_start + elapsed, energy / capacity);
        } else {
            // Drive until the driver seeks a charge. A vehicle which starts below that level goes
            // to charge straight away.
            let driving_time =
                available.max(Energy(0.0)) / params.efficiency / params.avg_speed;
            elapsed += driving_time;
            distance += params.avg_speed * driving_time;
            trace.push(
                shift_start + elapsed,
                energy.min(params.seek_charge_energy) / capacity,
            );

            energy = params.fast_charge_target * capacity;
            elapsed += params.fast_charge_duration;
            trace.push(shift_start + elapsed, params.fast_charge_target);
            fast_charges += 1;
            remaining = params.shift_length - elapsed;
        }
    }

    ShiftOutcome {
        fast_charges,
        spillover: (elapsed - params.shift_length).max(Hours(0.0)),
        distance,
    }
}

/// Simulate the night after a shift.
///
/// If the driver has a home charger, the vehicle charges until full or until the next shift
/// starts, whichever is sooner. Otherwise its state of charge is unchanged. The next shift always
/// starts 24 hours after the start of the previous one.
///
/// # Arguments
///
/// * `trace` - The vehicle's state of charge over time, which is extended for this night
/// * `params` - The vehicle's characteristics
/// * `spillover` - How long the previous shift overran
pub fn simulate_night(
    trace: &mut VehicleTrace,
    params: &VehicleParams,
    spillover: Hours,
) -> Result<NightOutcome> {
    let night_length = HOURS_PER_DAY - params.shift_length - spillover;
    ensure!(
        night_length >= Hours(0.0),
        "Shift of {} hours with {} hours of overrun leaves no time between shifts",
        params.shift_length,
        spillover
    );

    let shift_end = trace.last_time();
    let next_shift_start = shift_end + night_length;
    let start_soc = trace.last_soc();
    if !params.home_charging {
        trace.push(next_shift_start, start_soc);
        return Ok(NightOutcome {
            next_shift_start,
            home_charge_energy: Energy(0.0),
        });
    }

    let capacity = params.battery_capacity;
    let charge_power = params.home_charger_power * HOME_CHARGING_EFFICIENCY;
    let time_to_full = (capacity - start_soc * capacity) / charge_power;
    let end_soc = if time_to_full <= night_length {
        // Record when the battery became full, then wait for the next shift
        trace.push(shift_end + time_to_full, Dimensionless(1.0));
        Dimensionless(1.0)
    } else {
        (start_soc * capacity + charge_power * night_length) / capacity
    };
    trace.push(next_shift_start, end_soc);

    Ok(NightOutcome {
        next_shift_start,
        home_charge_energy: (end_soc - start_soc) * capacity,
    })
}

/// Simulate a vehicle for a number of days.
///
/// Each day consists of a shift followed by a night. Fast-charging energy is calculated from the
/// number of fast charges, assuming each one adds the same amount of energy.
///
/// # Arguments
///
/// * `params` - The vehicle's characteristics
/// * `initial_soc` - State of charge at the start of the first shift
/// * `days` - Number of days to simulate
pub fn simulate_n_days(
    params: &VehicleParams,
    initial_soc: Dimensionless,
    days: u32,
) -> Result<VehicleRun> {
    let mut trace = VehicleTrace::new(initial_soc);
    let mut shift_start = Hours(0.0);
    let mut fast_charges = 0;
    let mut distance = Miles(0.0);
    let mut home_charge_energy = Energy(0.0);

    for _ in 0..days {
        let shift = simulate_day(&mut trace, params, shift_start);
        fast_charges += shift.fast_charges;
        distance += shift.distance;

        let night = simulate_night(&mut trace, params, shift.spillover)?;
        home_charge_energy += night.home_charge_energy;
        shift_start = night.next_shift_start;
    }

    Ok(VehicleRun {
        trace,
        fast_charges,
        distance,
        fast_charge_energy: params.fast_charge_energy() * Dimensionless(f64::from(fast_charges)),
        home_charge_energy,
    })
}

//! Sampling of a regional fleet from driver permutations.
use super::permutation::Permutation;
use crate::units::{Dimensionless, Energy, Hours, Miles};
use anyhow::{Result, ensure};
use rand::Rng;

/// Daily totals for a sampled fleet of vehicles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledFleet {
    /// Number of vehicles
    pub vehicles: u32,
    /// Distance driven
    pub distance: Miles,
    /// Number of fast charges
    pub fast_charges: f64,
    /// Time spent fast charging
    pub fast_charge_hours: Hours,
    /// Time fast chargers are occupied for, including plugging in
    pub plug_hours: Hours,
    /// Energy added by fast charging to vehicles whose drivers can charge at home
    pub fast_charge_energy_with_home: Energy,
    /// Energy added by fast charging to vehicles whose drivers cannot charge at home
    pub fast_charge_energy_without_home: Energy,
    /// Energy added by home charging
    pub home_charge_energy: Energy,
}

impl SampledFleet {
    /// Add a vehicle of the given kind to the fleet
    fn add(&mut self, permutation: &Permutation) {
        let fast_charges = Dimensionless(permutation.fast_charges_per_day);

        self.vehicles += 1;
        self.distance += permutation.distance_per_day;
        self.fast_charges += permutation.fast_charges_per_day;
        self.fast_charge_hours += permutation.fast_charge_time * fast_charges;
        self.plug_hours += permutation.plug_occupied_time * fast_charges;
        if permutation.home_charging {
            self.fast_charge_energy_with_home += permutation.fast_charge_energy_per_day;
        } else {
            self.fast_charge_energy_without_home += permutation.fast_charge_energy_per_day;
        }
        self.home_charge_energy += permutation.home_charge_energy_per_day;
    }
}

/// Draw vehicles at random until they drive the target distance between them.
///
/// Each permutation is drawn with a probability proportional to its weight. Draws are made with
/// replacement.
///
/// # Arguments
///
/// * `permutations` - The kinds of vehicle to draw from
/// * `target` - Daily distance the fleet must cover
/// * `rng` - Random number generator
pub fn sample_fleet<R: Rng>(
    permutations: &[Permutation],
    target: Miles,
    rng: &mut R,
) -> Result<SampledFleet> {
    let pool: Vec<_> = permutations
        .iter()
        .flat_map(|permutation| std::iter::repeat_n(permutation, permutation.weight as usize))
        .collect();
    ensure!(
        !pool.is_empty(),
        "Cannot sample a fleet: no driver permutation has a non-zero weight"
    );
    for permutation in permutations.iter().filter(|p| p.weight > 0) {
        ensure!(
            permutation.distance_per_day > Miles(0.0),
            "Cannot sample a fleet: vehicles in permutation {} drive no distance",
            permutation.key
        );
    }

    let mut fleet = SampledFleet::default();
    while fleet.distance < target {
        let permutation = pool[rng.gen_range(0..pool.len())];
        fleet.add(permutation);
    }

    Ok(fleet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, permutation};
    use float_cmp::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    #[rstest]
    fn test_sample_fleet_single_permutation(permutation: Permutation) {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let fleet = sample_fleet(&[permutation.clone()], Miles(1000.0), &mut rng).unwrap();

        // 200 miles per vehicle
        assert_eq!(fleet.vehicles, 5);
        assert_eq!(fleet.distance, Miles(1000.0));
        assert_approx_eq!(f64, fleet.fast_charges, 5.0 * permutation.fast_charges_per_day);
        assert_approx_eq!(
            f64,
            fleet.fast_charge_hours.value(),
            5.0 * permutation.fast_charges_per_day * permutation.fast_charge_time.value()
        );
        assert_approx_eq!(
            f64,
            fleet.plug_hours.value(),
            5.0 * permutation.fast_charges_per_day * permutation.plug_occupied_time.value()
        );
        assert_eq!(fleet.fast_charge_energy_with_home, Energy(0.0));
        assert_approx_eq!(
            f64,
            fleet.fast_charge_energy_without_home.value(),
            5.0 * permutation.fast_charge_energy_per_day.value()
        );
    }

    #[rstest]
    fn test_sample_fleet_home_charging_bucket(mut permutation: Permutation) {
        permutation.home_charging = true;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let fleet = sample_fleet(&[permutation.clone()], Miles(400.0), &mut rng).unwrap();

        assert_eq!(fleet.vehicles, 2);
        assert_eq!(fleet.fast_charge_energy_without_home, Energy(0.0));
        assert_approx_eq!(
            f64,
            fleet.fast_charge_energy_with_home.value(),
            2.0 * permutation.fast_charge_energy_per_day.value()
        );
        assert_approx_eq!(
            f64,
            fleet.home_charge_energy.value(),
            2.0 * permutation.home_charge_energy_per_day.value()
        );
    }

    #[rstest]
    fn test_sample_fleet_zero_target(permutation: Permutation) {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let fleet = sample_fleet(&[permutation], Miles(0.0), &mut rng).unwrap();
        assert_eq!(fleet, SampledFleet::default());
    }

    #[rstest]
    fn test_sample_fleet_bounds(permutation: Permutation) {
        let mut short = permutation.clone();
        short.key = "0_4_60".into();
        short.distance_per_day = Miles(50.0);
        short.weight = 30;
        let mut long = permutation;
        long.weight = 10;
        let permutations = [short, long];

        let target = Miles(10_000.0);
        for seed in 0..5 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let fleet = sample_fleet(&permutations, target, &mut rng).unwrap();

            // Between target / longest and target / shortest vehicles, overshooting by less than
            // one vehicle's distance
            assert!((50..=200).contains(&fleet.vehicles));
            assert!(fleet.distance >= target);
            assert!(fleet.distance < target + Miles(200.0));
        }
    }

    #[rstest]
    fn test_sample_fleet_same_seed_same_fleet(permutation: Permutation) {
        let mut short = permutation.clone();
        short.distance_per_day = Miles(120.0);
        let permutations = [short, permutation];

        let sample = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            sample_fleet(&permutations, Miles(5000.0), &mut rng).unwrap()
        };
        assert_eq!(sample(42), sample(42));
    }

    #[rstest]
    fn test_sample_fleet_empty_pool(mut permutation: Permutation) {
        permutation.weight = 0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_error!(
            sample_fleet(&[permutation], Miles(100.0), &mut rng),
            "Cannot sample a fleet: no driver permutation has a non-zero weight"
        );
    }

    #[rstest]
    fn test_sample_fleet_no_distance(mut permutation: Permutation) {
        permutation.distance_per_day = Miles(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_error!(
            sample_fleet(&[permutation], Miles(100.0), &mut rng),
            "Cannot sample a fleet: vehicles in permutation 0_8_100 drive no distance"
        );
    }
}

//! Code for reading the normalised fast-charging power curve.
use super::*;
use crate::units::Dimensionless;
use serde::Deserialize;

const POWER_CURVE_FILE_NAME: &str = "normalized_power_curve.csv";

/// A point on the power curve, as read from file
#[derive(Debug, PartialEq, Deserialize)]
struct PowerCurvePointRaw {
    soc: f64,
    rel_power: f64,
}

/// The power a vehicle accepts while fast charging, relative to its maximum, as a function of its
/// state of charge.
///
/// Points are sorted by state of charge and cover the range 0 to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerCurve {
    soc: Vec<f64>,
    rel_power: Vec<f64>,
}

impl PowerCurve {
    /// Create a new power curve from `(soc, relative power)` points.
    ///
    /// # Returns
    ///
    /// The curve or an error if the points are unsorted, do not span 0 to 1 or have relative
    /// powers outside 0 to 1.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let (soc, rel_power): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        ensure!(
            soc.len() >= 2,
            "Power curve must have at least two points"
        );
        ensure!(
            is_sorted_and_unique(&soc),
            "State of charge values must be unique and in ascending order"
        );
        ensure!(
            soc.first() == Some(&0.0) && soc.last() == Some(&1.0),
            "Power curve must cover state of charge values from 0 to 1"
        );
        ensure!(
            rel_power.iter().all(|p| (0.0..=1.0).contains(p)),
            "Relative power values must be between 0 and 1"
        );

        Ok(Self { soc, rel_power })
    }

    /// Linearly interpolate the relative power at the given state of charge.
    ///
    /// Returns an error if `soc` is outside the range covered by the curve.
    pub fn relative_power(&self, soc: Dimensionless) -> Result<Dimensionless> {
        let soc = soc.value();
        let (first, last) = (self.soc[0], self.soc[self.soc.len() - 1]);
        ensure!(
            (first..=last).contains(&soc),
            "State of charge {soc} is outside the range of the power curve ({first} to {last})"
        );

        // Index of the segment containing soc
        let i = self
            .soc
            .partition_point(|&x| x <= soc)
            .clamp(1, self.soc.len() - 1)
            - 1;
        let (x0, x1) = (self.soc[i], self.soc[i + 1]);
        let (y0, y1) = (self.rel_power[i], self.rel_power[i + 1]);
        let frac = (soc - x0) / (x1 - x0);

        Ok(Dimensionless(y0 + frac * (y1 - y0)))
    }
}

/// Read the power curve from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_power_curve(model_dir: &Path) -> Result<PowerCurve> {
    let file_path = model_dir.join(POWER_CURVE_FILE_NAME);
    let iter = read_csv::<PowerCurvePointRaw>(&file_path)?;
    PowerCurve::new(iter.map(|point| (point.soc, point.rel_power)))
        .with_context(|| input_err_msg(&file_path))
}

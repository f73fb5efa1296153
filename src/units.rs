//! This module defines various unit types and their conversions.
//!
//! Energies are in kWh, powers in kW, durations in hours and distances in miles.
#![allow(missing_docs)]
use serde::{Deserialize, Serialize};

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// The larger of two quantities
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// The smaller of two quantities
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }
        }

        impl From<f64> for $name {
            fn from(val: f64) -> Self {
                Self(val)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::default(), |acc, x| acc + x)
            }
        }
    };
}

macro_rules! impl_dimensionless_ops {
    ($name:ident) => {
        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

// Dimensionless quantities (state of charge, fractions)
unit_struct!(Dimensionless);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

// Base quantities
unit_struct!(Energy);
unit_struct!(Power);
unit_struct!(Hours);
unit_struct!(Miles);

// Derived quantities
unit_struct!(MilesPerHour);
unit_struct!(EnergyPerMile);

impl_dimensionless_ops!(Energy);
impl_dimensionless_ops!(Power);
impl_dimensionless_ops!(Hours);
impl_dimensionless_ops!(Miles);
impl_dimensionless_ops!(MilesPerHour);
impl_dimensionless_ops!(EnergyPerMile);

impl Hours {
    /// Create a duration from a number of minutes
    pub fn from_minutes(minutes: f64) -> Self {
        Self(minutes / 60.0)
    }

    /// Create a duration from a number of seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self(seconds / 3600.0)
    }
}

impl EnergyPerMile {
    /// Create an efficiency from a value in Wh/mile
    pub fn from_wh_per_mile(wh_per_mile: f64) -> Self {
        Self(wh_per_mile / 1000.0)
    }

    /// The efficiency in Wh/mile
    pub fn wh_per_mile(self) -> f64 {
        self.0 * 1000.0
    }
}

// Multiplication rules
impl_mul!(Power, Hours, Energy);
impl_mul!(MilesPerHour, Hours, Miles);
impl_mul!(Miles, EnergyPerMile, Energy);

// Division rules
impl_div!(Energy, Power, Hours);
impl_div!(Energy, EnergyPerMile, Miles);
impl_div!(Miles, MilesPerHour, Hours);

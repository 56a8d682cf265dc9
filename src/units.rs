//! Typed electrical and thermal quantities
//!
//! The bench instruments speak plain decimal numbers on the wire, so these are thin
//! `f64` wrappers rather than a lossless fixed-point representation. The point of the
//! types is to make it impossible to hand the supply a current or the chamber a
//! wattage, not to do unit algebra.

use std::{
    fmt,
    num::ParseFloatError,
    ops::{ Add, AddAssign, Mul, Sub },
    str::FromStr,
};
use serde::{ Deserialize, Serialize };

macro_rules! quantity
{
    {
        $(#[$meta:meta])*
        $name:ident, $symbol:literal
    } => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(f64);

        impl $name
        {
            pub const fn new(value: f64) -> Self
            {
                Self(value)
            }

            pub const fn zero() -> Self
            {
                Self(0.0)
            }

            /// The raw numeric value, as written on the wire
            pub const fn value(&self) -> f64
            {
                self.0
            }

            pub fn is_zero(&self) -> bool
            {
                self.0 == 0.0
            }
        }

        impl Add for $name
        {
            type Output = Self;

            fn add(self, rhs: Self) -> Self
            {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name
        {
            fn add_assign(&mut self, rhs: Self)
            {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name
        {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self
            {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name
        {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self
            {
                Self(self.0 * rhs)
            }
        }

        impl fmt::Display for $name
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
            {
                write!(f, "{} {}", self.0, $symbol)
            }
        }

        impl FromStr for $name
        {
            type Err = ParseFloatError;

            fn from_str(text: &str) -> Result<Self, Self::Err>
            {
                Ok(Self(text.trim().parse::<f64>()?))
            }
        }
    };
}

quantity!{
    /// Electric current in amperes
    Amp, "A"
}

quantity!{
    /// Electric potential in volts
    Volt, "V"
}

quantity!{
    /// Power in watts
    Watt, "W"
}

quantity!{
    /// Temperature in degrees Celsius
    Celsius, "°C"
}

impl Mul<Amp> for Volt
{
    type Output = Watt;

    fn mul(self, rhs: Amp) -> Watt
    {
        Watt::new(self.0 * rhs.0)
    }
}

impl From<i32> for Celsius
{
    fn from(degrees: i32) -> Self
    {
        Self(degrees as f64)
    }
}

impl Celsius
{
    /// Whether this reading is within `tolerance` degrees of `target`
    pub fn within(&self, target: Celsius, tolerance: f64) -> bool
    {
        (self.0 - target.0).abs() <= tolerance
    }
}

//! Fixed-point math utilities for deterministic simulation.
//!
//! All quantities, durations and capacities use fixed-point arithmetic to
//! ensure deterministic behavior across platforms. Floating-point values are
//! only touched once, when human-authored data files are parsed.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Clamp a value to be non-negative.
#[must_use]
pub fn non_negative(value: Fixed) -> Fixed {
    value.max(Fixed::ZERO)
}

/// Serde support for fixed-point numbers in human-authored data files.
///
/// Values are written as decimals (`2.5`) and converted to fixed-point
/// once at load time. Out-of-range or non-finite values are rejected.
pub mod fixed_serde {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("value {value} is out of fixed-point range")))
    }
}

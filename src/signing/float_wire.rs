use crate::errors::{HyperliquidError, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimal places the exchange keeps for prices and sizes.
pub const WIRE_DECIMALS: usize = 8;

/// Largest magnitude that still fits the exchange's fixed-precision representation.
pub const MAX_WIRE_MAGNITUDE: f64 = 1e20;

const ROUNDING_TOLERANCE: f64 = 1e-12;

/// Convert a price or size into the decimal string the signature verifier re-hashes.
///
/// The value is rounded to 8 decimal places, trailing zeros are trimmed and the
/// result never uses scientific notation. Values that would change by rounding,
/// non-finite values and values outside the fixed-precision range are rejected.
pub fn float_to_wire(x: f64) -> Result<String> {
    if !x.is_finite() {
        return Err(HyperliquidError::InvalidNumber(format!(
            "{} is not a finite number",
            x
        )));
    }
    if x.abs() >= MAX_WIRE_MAGNITUDE {
        return Err(HyperliquidError::InvalidNumber(format!(
            "{} exceeds the wire range of {:e}",
            x, MAX_WIRE_MAGNITUDE
        )));
    }

    let rounded = format!("{:.*}", WIRE_DECIMALS, x);
    let reparsed = rounded
        .parse::<f64>()
        .map_err(|e| HyperliquidError::InvalidNumber(format!("{}: {}", rounded, e)))?;
    if (reparsed - x).abs() >= ROUNDING_TOLERANCE {
        return Err(HyperliquidError::InvalidNumber(format!(
            "{} loses precision when rounded to {} decimals",
            x, WIRE_DECIMALS
        )));
    }

    let decimal = Decimal::from_str(&rounded)
        .map_err(|e| HyperliquidError::InvalidNumber(format!("{}: {}", rounded, e)))?;
    if decimal.is_zero() {
        return Ok("0".to_string());
    }

    Ok(decimal.normalize().to_string())
}

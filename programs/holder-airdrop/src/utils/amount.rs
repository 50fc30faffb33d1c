//! Conversions between decimal asset units and integer base units.

use crate::error::{AirdropError, Result};

fn scale(decimals: u8) -> Result<u64> {
    10u64
        .checked_pow(decimals as u32)
        .ok_or(AirdropError::MathOverflow)
}

/// Convert an operator-supplied decimal amount into base units, rounding to
/// the nearest unit.
pub fn units_to_base(units: f64, decimals: u8) -> Result<u64> {
    if !units.is_finite() || units < 0.0 {
        return Err(AirdropError::InvalidConfig(format!(
            "amount must be a finite non-negative number, got {units}"
        )));
    }
    let scaled = (units * scale(decimals)? as f64).round();
    if scaled >= u64::MAX as f64 {
        return Err(AirdropError::MathOverflow);
    }
    Ok(scaled as u64)
}

/// Render base units with exactly `decimals` fractional digits.
pub fn format_base(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    // decimals above 19 cannot be represented in u64 anyway.
    let factor = match scale(decimals) {
        Ok(f) => f,
        Err(_) => return amount.to_string(),
    };
    format!(
        "{}.{:0width$}",
        amount / factor,
        amount % factor,
        width = decimals as usize
    )
}

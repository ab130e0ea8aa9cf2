//! Decimal currency ⇄ fixed-point asset unit conversion.

/// Width of the snap window, in ulps of the scaled value.
///
/// `19.99 * 10^6` lands a hair below `19_990_000` in IEEE-754; a bare floor
/// would eat one unit of real value. The window is relative to the scaled
/// magnitude so the snap works the same for eight-figure amounts, while a
/// genuine sub-unit remainder is always far outside it.
const SNAP_ULPS: f64 = 4.0;

/// Convert a decimal currency amount to integer asset units.
///
/// Truncates toward zero: any fractional remainder below the unit resolution
/// is dropped, never rounded up.
pub fn to_units(amount: f64, decimals: u32) -> u64 {
    let scaled = amount * 10f64.powi(decimals as i32);
    let nearest = scaled.round();
    let tolerance = (scaled.abs() * f64::EPSILON * SNAP_ULPS).max(f64::EPSILON);
    let snapped = if (scaled - nearest).abs() <= tolerance {
        nearest
    } else {
        scaled.floor()
    };
    snapped.max(0.0) as u64
}

/// Convert integer asset units back to a decimal currency amount.
pub fn from_units(units: u64, decimals: u32) -> f64 {
    units as f64 / 10f64.powi(decimals as i32)
}

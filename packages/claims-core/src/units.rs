use num_bigint::BigUint;

/// Render a minor-unit amount as a decimal string with `decimals` fractional
/// digits, trimming trailing zeros but keeping at least one.
///
/// `format_units(&1_500_000_000_000_000_000u64.into(), 18)` → `"1.5"`
pub fn format_units(amount: &BigUint, decimals: u32) -> String {
    let digits = amount.to_str_radix(10);
    let decimals = decimals as usize;
    if decimals == 0 {
        return format!("{digits}.0");
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    let frac = if frac.is_empty() { "0" } else { frac };

    format!("{whole}.{frac}")
}

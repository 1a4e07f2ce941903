//! Display formatting for coin amounts, counters and hashrates.

const HASH_UNITS: [&str; 6] = ["H", "KH", "MH", "GH", "TH", "PH"];

/// Inserts `,` every three digits from the right: `1234567` -> `"1,234,567"`.
pub fn group_thousands(value: u64) -> String {
    group_digits(&value.to_string())
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats a display amount with thousands separators and exactly
/// `decimal_places` fractional digits. The sign is dropped.
///
/// `pretty_amount(1234567.0, 3)` gives `"1,234,567.000"`.
pub fn pretty_amount(amount: f64, decimal_places: usize) -> String {
    let fixed = format!("{:.*}", decimal_places, amount.abs());
    match fixed.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", group_digits(int_part), frac),
        None => group_digits(&fixed),
    }
}

/// Formats an amount held in atomic units, dividing by `10^decimal_places`
/// with integer arithmetic.
///
/// `pretty_atomic(1234567, 3)` gives `"1,234.567"`.
pub fn pretty_atomic(atomic: u64, decimal_places: u32) -> String {
    let divisor = 10u64.pow(decimal_places);
    let whole = group_thousands(atomic / divisor);
    if decimal_places == 0 {
        return whole;
    }
    format!(
        "{}.{:0width$}",
        whole,
        atomic % divisor,
        width = decimal_places as usize
    )
}

/// Divides by 1000 while the value exceeds 1000 and appends the matching
/// unit, e.g. `1_500_000` -> `"1.50 MH/s"`.
pub fn readable_hashrate(hashrate: u64, decimals: usize) -> String {
    let mut value = hashrate as f64;
    let mut unit = 0;

    while value > 1000.0 && unit < HASH_UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    format!("{:.*} {}/s", decimals, value, HASH_UNITS[unit])
}

/// `part * 100 / whole` to two decimals, `"0.00"` when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", part as f64 * 100.0 / whole as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(100000), "100,000");
    }

    #[test]
    fn test_pretty_amount() {
        assert_eq!(pretty_amount(1234567.0, 3), "1,234,567.000");
        assert_eq!(pretty_amount(1.5, 3), "1.500");
        assert_eq!(pretty_amount(25.0, 0), "25");
        assert_eq!(pretty_amount(-1000.25, 2), "1,000.25");
    }

    #[test]
    fn test_pretty_atomic() {
        assert_eq!(pretty_atomic(1234567, 3), "1,234.567");
        assert_eq!(pretty_atomic(1000, 3), "1.000");
        assert_eq!(pretty_atomic(5, 3), "0.005");
        assert_eq!(pretty_atomic(25000, 0), "25,000");
        assert_eq!(pretty_atomic(0, 2), "0.00");
    }

    #[test]
    fn test_readable_hashrate() {
        assert_eq!(readable_hashrate(0, 2), "0.00 H/s");
        assert_eq!(readable_hashrate(999, 2), "999.00 H/s");
        assert_eq!(readable_hashrate(1_500_000, 2), "1.50 MH/s");
        assert_eq!(readable_hashrate(2_000_000_000, 1), "2.0 GH/s");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(50, 200), "25.00");
        assert_eq!(percentage(10, 0), "0.00");
        assert_eq!(percentage(200, 200), "100.00");
    }
}

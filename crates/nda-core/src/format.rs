//! Number formatting for composite text fields.

const SIGNIFICANT_DIGITS: i32 = 6;

/// Formats a number like C's `%g`: six significant digits, trailing zeros
/// removed, exponent notation outside `1e-4 <= |value| < 1e6`.
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = (SIGNIFICANT_DIGITS - 1) as usize;
    let scientific = format!("{value:.precision$e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Joins two numbers as `"<a> x <b>"`.
pub fn format_pair(first: f64, second: f64) -> String {
    format!("{} x {}", format_general(first), format_general(second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_printf_general_format() {
        assert_eq!(format_general(64.0), "64");
        assert_eq!(format_general(f64::from(0.9f32)), "0.9");
        assert_eq!(format_general(2.5), "2.5");
        assert_eq!(format_general(1.0 / 3.0), "0.333333");
        assert_eq!(format_general(123456.0), "123456");
        assert_eq!(format_general(1234567.0), "1.23457e+06");
        assert_eq!(format_general(0.0001), "0.0001");
        assert_eq!(format_general(0.00001), "1e-05");
        assert_eq!(format_general(-3.25), "-3.25");
        assert_eq!(format_general(0.0), "0");
    }

    #[test]
    fn pair_uses_times_separator() {
        assert_eq!(format_pair(256.0, 256.0), "256 x 256");
        assert_eq!(format_pair(f64::from(0.9f32), 1.2), "0.9 x 1.2");
    }
}

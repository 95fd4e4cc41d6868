use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

const THOUSAND: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
const BILLION: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Parse a scraped market-cap string such as `$1.5M` or `2,300`.
///
/// The multiplier is chosen by substring containment in K, M, B order, so the
/// first letter that appears anywhere wins. Unparseable input yields zero.
/// The result carries no trailing zeros, whatever the input's precision.
pub fn parse_numeric_value(text: &str) -> Decimal {
    let clean = text
        .trim()
        .replacen('$', "", 1)
        .replace(',', "")
        .to_uppercase();

    let multiplier = if clean.contains('K') {
        THOUSAND
    } else if clean.contains('M') {
        MILLION
    } else if clean.contains('B') {
        BILLION
    } else {
        Decimal::ONE
    };

    let digits: String = clean
        .chars()
        .filter(|c| !matches!(c, 'K' | 'M' | 'B'))
        .collect();

    leading_decimal(&digits)
        .and_then(|value| value.checked_mul(multiplier))
        .map(|value| value.normalize())
        .unwrap_or(Decimal::ZERO)
}

/// Longest numeric prefix: optional sign, digits, optional fraction.
fn leading_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digit_count = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digit_count += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digit_count == 0 {
        return None;
    }

    Decimal::from_str(&text[..end]).ok()
}

/// Compact market-cap display: `1.2B`, `3.4M`, `5.6K`, or a whole number.
pub fn format_mcap(mcap: Decimal) -> String {
    if mcap.is_zero() {
        return "0".to_string();
    }
    if mcap >= BILLION {
        format!("{}B", one_decimal(mcap / BILLION))
    } else if mcap >= MILLION {
        format!("{}M", one_decimal(mcap / MILLION))
    } else if mcap >= THOUSAND {
        format!("{}K", one_decimal(mcap / THOUSAND))
    } else {
        format!(
            "{:.0}",
            mcap.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}

/// Signed percentage with two decimals, e.g. `+12.34%`.
pub fn format_roi(pct: Decimal) -> String {
    let rounded = pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded >= Decimal::ZERO { "+" } else { "" };
    format!("{}{:.2}%", sign, rounded)
}

fn one_decimal(value: Decimal) -> String {
    format!(
        "{:.1}",
        value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_numeric_value("1.5M"), dec!(1500000));
        assert_eq!(parse_numeric_value("$12.3K"), dec!(12300));
        assert_eq!(parse_numeric_value("2b"), dec!(2000000000));
        assert_eq!(parse_numeric_value("  $4.20m "), dec!(4200000));
    }

    #[test]
    fn test_parse_thousands_separators() {
        assert_eq!(parse_numeric_value("$2,300"), dec!(2300));
        assert_eq!(parse_numeric_value("1,234,567.5"), dec!(1234567.5));
    }

    #[test]
    fn test_parse_garbage_is_zero() {
        assert_eq!(parse_numeric_value("garbage"), Decimal::ZERO);
        assert_eq!(parse_numeric_value(""), Decimal::ZERO);
        assert_eq!(parse_numeric_value("$"), Decimal::ZERO);
        assert_eq!(parse_numeric_value("."), Decimal::ZERO);
    }

    #[test]
    fn test_parse_ignores_trailing_text() {
        // Only the numeric prefix counts.
        assert_eq!(parse_numeric_value("$25.1K (+3%)"), dec!(25100));
        assert_eq!(parse_numeric_value("42 SOL"), dec!(42));
    }

    #[test]
    fn test_parse_first_suffix_wins() {
        // Both K and M appear: K is checked first.
        assert_eq!(parse_numeric_value("1.5MK"), dec!(1500));
        // A label in front of the number leaves no numeric prefix.
        assert_eq!(parse_numeric_value("Market Cap $1.2M"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_drops_input_scale() {
        assert_eq!(parse_numeric_value("$.75M").to_string(), "750000");
        assert_eq!(parse_numeric_value("10.0K").to_string(), "10000");
        assert_eq!(parse_numeric_value("$1,200.50").to_string(), "1200.5");
        assert_eq!(parse_numeric_value("0.00").to_string(), "0");
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(parse_numeric_value("-3.5K"), dec!(-3500));
    }

    #[test]
    fn test_format_mcap() {
        assert_eq!(format_mcap(dec!(0)), "0");
        assert_eq!(format_mcap(dec!(999.4)), "999");
        assert_eq!(format_mcap(dec!(999.5)), "1000");
        assert_eq!(format_mcap(dec!(1000)), "1.0K");
        assert_eq!(format_mcap(dec!(12345)), "12.3K");
        assert_eq!(format_mcap(dec!(1500000)), "1.5M");
        assert_eq!(format_mcap(dec!(2340000000)), "2.3B");
    }

    #[test]
    fn test_format_then_parse_stays_within_precision() {
        let samples = [
            dec!(7),
            dec!(512),
            dec!(4321),
            dec!(98765),
            dec!(1234567),
            dec!(3456789012),
        ];
        for mcap in samples {
            let parsed = parse_numeric_value(&format_mcap(mcap));
            let tolerance = if mcap >= BILLION {
                dec!(50000000)
            } else if mcap >= MILLION {
                dec!(50000)
            } else if mcap >= THOUSAND {
                dec!(50)
            } else {
                dec!(0.5)
            };
            assert!(
                (parsed - mcap).abs() <= tolerance,
                "{} -> {} -> {}",
                mcap,
                format_mcap(mcap),
                parsed
            );
        }
    }

    #[test]
    fn test_format_roi() {
        assert_eq!(format_roi(dec!(50)), "+50.00%");
        assert_eq!(format_roi(dec!(-12.345)), "-12.35%");
        assert_eq!(format_roi(dec!(0)), "+0.00%");
    }
}

//! Display formatting for fixed-point amounts and addresses.
//!
//! All helpers work on decimal strings so that 30-decimal USD values never
//! pass through floating point.

use alloy::primitives::U256;

/// Placeholder shown while a value is unavailable.
pub const PLACEHOLDER: &str = "...";

/// Render `amount` as a decimal string with `decimals` fractional digits.
///
/// Trailing fractional zeros are removed but at least one fractional digit
/// is kept (`1.0`). With zero decimals no dot is emitted.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    if decimals == 0 {
        return digits;
    }
    let decimals = decimals as usize;
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };
    format!("{whole}.{fraction}")
}

/// Truncate (never round) the fractional part to `max_decimals` digits.
pub fn limit_decimals(amount: &str, max_decimals: Option<usize>) -> String {
    let Some(max_decimals) = max_decimals else {
        return amount.to_string();
    };
    if max_decimals == 0 {
        return amount.split('.').next().unwrap_or_default().to_string();
    }
    match amount.find('.') {
        Some(dot) => {
            let decimals = amount.len() - dot - 1;
            if decimals > max_decimals {
                amount[..amount.len() - (decimals - max_decimals)].to_string()
            } else {
                amount.to_string()
            }
        }
        None => amount.to_string(),
    }
}

/// Right-pad the fractional part with zeros up to `min_decimals`.
///
/// A value without a dot always gets `.0000` appended.
pub fn pad_decimals(amount: &str, min_decimals: usize) -> String {
    match amount.find('.') {
        Some(dot) => {
            let decimals = amount.len() - dot - 1;
            if decimals < min_decimals {
                format!("{amount}{}", "0".repeat(min_decimals - decimals))
            } else {
                amount.to_string()
            }
        }
        None => format!("{amount}.0000"),
    }
}

/// Drop an all-zero fractional part (`"12.000"` -> `"12"`).
pub fn trim_zero_decimals(amount: &str) -> String {
    match amount.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole.to_string(),
        _ => amount.to_string(),
    }
}

/// Insert thousands separators into the integer part.
pub fn number_with_commas(value: &str) -> String {
    if value.is_empty() {
        return PLACEHOLDER.to_string();
    }
    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (value, None),
    };
    let (sign, digits) = match whole.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", whole),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format an optional fixed-point amount for display.
///
/// Missing amounts render as `...`. `display_decimals` defaults to 4.
pub fn format_amount(
    amount: Option<U256>,
    token_decimals: u8,
    display_decimals: Option<usize>,
    use_commas: bool,
) -> String {
    let Some(amount) = amount else {
        return PLACEHOLDER.to_string();
    };
    let display_decimals = display_decimals.unwrap_or(4);
    let mut text = limit_decimals(&format_units(amount, token_decimals), Some(display_decimals));
    if display_decimals != 0 {
        text = pad_decimals(&text, display_decimals);
    }
    if use_commas {
        return number_with_commas(&text);
    }
    text
}

/// Format without padding, dropping an all-zero fraction.
pub fn format_amount_free(amount: Option<U256>, token_decimals: u8, display_decimals: usize) -> String {
    let Some(amount) = amount else {
        return PLACEHOLDER.to_string();
    };
    let text = limit_decimals(&format_units(amount, token_decimals), Some(display_decimals));
    trim_zero_decimals(&text)
}

/// Parse user input into a fixed-point amount.
///
/// Extra fractional digits beyond `token_decimals` are truncated. Returns
/// `None` for anything that is not a plain non-negative decimal number.
pub fn parse_value(value: &str, token_decimals: u8) -> Option<U256> {
    let value = value.trim();
    if value.is_empty() || value == "." || !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let limited = limit_decimals(value, Some(token_decimals as usize));
    let (whole, fraction) = match limited.split_once('.') {
        Some((w, f)) => (w, f),
        None => (limited.as_str(), ""),
    };
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole = if whole.is_empty() { "0" } else { whole };
    let scaled = format!(
        "{whole}{fraction}{}",
        "0".repeat(token_decimals as usize - fraction.len())
    );
    U256::from_str_radix(&scaled, 10).ok()
}

/// Shorten an address to `length` characters with `...` in the middle.
///
/// A zero `length` yields an empty string; addresses shorter than ten
/// characters are returned unchanged.
pub fn shorten_address(address: &str, length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 || length < 3 {
        return address.to_string();
    }
    let left = (length - 3) / 2 + 1;
    let right = length.saturating_sub(left + 3);
    let left = left.min(chars.len());
    let right_start = chars.len().saturating_sub(right).max(left);
    let head: String = chars[..left].iter().collect();
    let tail: String = chars[right_start..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::expand_decimals;

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1.0");
        assert_eq!(format_units(U256::from(5u64), 3), "0.005");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_limit_decimals_truncates() {
        assert_eq!(limit_decimals("1.23456", Some(2)), "1.23");
        assert_eq!(limit_decimals("1.2", Some(4)), "1.2");
        assert_eq!(limit_decimals("1.99", Some(0)), "1");
        assert_eq!(limit_decimals("1.99", None), "1.99");
    }

    #[test]
    fn test_pad_decimals() {
        assert_eq!(pad_decimals("1.5", 4), "1.5000");
        assert_eq!(pad_decimals("1.55555", 2), "1.55555");
        // No dot always gets four zeros
        assert_eq!(pad_decimals("7", 2), "7.0000");
    }

    #[test]
    fn test_number_with_commas() {
        assert_eq!(number_with_commas("1234567.891"), "1,234,567.891");
        assert_eq!(number_with_commas("123"), "123");
        assert_eq!(number_with_commas("-1000"), "-1,000");
        assert_eq!(number_with_commas(""), "...");
    }

    #[test]
    fn test_format_amount_usd() {
        let amount = expand_decimals(1_234_567, 30) + expand_decimals(5, 28);
        assert_eq!(format_amount(Some(amount), 30, Some(2), true), "1,234,567.05");
        assert_eq!(format_amount(None, 30, Some(2), true), "...");
    }

    #[test]
    fn test_format_amount_free() {
        assert_eq!(format_amount_free(Some(expand_decimals(3, 18)), 18, 4), "3");
        assert_eq!(format_amount_free(Some(U256::ZERO), 18, 4), "0");
        assert_eq!(format_amount_free(None, 18, 4), "...");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("1.5", 6), Some(U256::from(1_500_000u64)));
        assert_eq!(parse_value(".25", 2), Some(U256::from(25u64)));
        assert_eq!(parse_value("0.1234567", 3), Some(U256::from(123u64)));
        assert_eq!(parse_value("abc", 18), None);
        assert_eq!(parse_value("", 18), None);
        assert_eq!(parse_value("-1", 18), None);
    }

    #[test]
    fn test_shorten_address() {
        let short = shorten_address("0xABCDEF1234567890", 10);
        assert_eq!(short.len(), 10);
        assert_eq!(short, "0xAB...890");
        assert!(short.contains("..."));
    }

    #[test]
    fn test_shorten_address_edge_cases() {
        assert_eq!(shorten_address("0xABCDEF1234567890", 0), "");
        assert_eq!(shorten_address("0x1234", 10), "0x1234");
    }

    #[test]
    fn test_shorten_address_counts_chars() {
        assert_eq!(shorten_address("0xÄÖÜ€1234567890", 10), "0xÄÖ...890");
        assert_eq!(shorten_address("ééééééééééé", 7), "ééé...é");
        assert_eq!(shorten_address("ééé", 7), "ééé");
    }
}

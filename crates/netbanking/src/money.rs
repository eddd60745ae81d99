//! Money formatting for display values.
//!
//! The netbanking API transmits amounts as an integer digit string plus a
//! `precision` (number of trailing fractional digits) and a currency code.
//! These helpers turn that triple into strings like `1 234.56 CZK`.

/// Largest precision honoured; anything above is treated as this many digits.
pub const MAX_PRECISION: usize = 18;

/// Place the decimal point `precision` digits from the right and append the currency.
///
/// A precision of zero always renders two zero decimals (`500` -> `500.00 USD`).
/// Values shorter than the precision are left-padded with zeros, so the output
/// carries exactly `precision` fractional digits, up to [`MAX_PRECISION`].
pub fn format_amount(raw_value: &str, precision: u32, currency: &str) -> String {
    let raw_value = raw_value.trim();
    if precision == 0 {
        return format!("{}.00 {}", raw_value, currency);
    }

    let (sign, digits) = match raw_value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw_value),
    };

    let precision = (precision as usize).min(MAX_PRECISION);
    let padding = (precision + 1).saturating_sub(digits.chars().count());
    let digits: Vec<char> = std::iter::repeat('0')
        .take(padding)
        .chain(digits.chars())
        .collect();

    let split = digits.len() - precision;
    let integer: String = digits[..split].iter().collect();
    let fraction: String = digits[split..].iter().collect();
    format!("{}{}.{} {}", sign, integer, fraction, currency)
}

/// Insert a space every three digits of the integer part, counting leftward
/// from the decimal point (or from the end when there is none).
///
/// No separator is placed directly after a leading minus sign, and anything
/// from the first `.` onward is copied through untouched.
pub fn group_thousands(value: &str) -> String {
    let (integer, rest) = match value.find('.') {
        Some(idx) => value.split_at(idx),
        None => (value, ""),
    };

    let chars: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(value.len() + chars.len() / 3);
    for (idx, c) in chars.iter().enumerate() {
        let remaining = chars.len() - idx;
        if idx > 0 && remaining % 3 == 0 && chars[idx - 1] != '-' {
            grouped.push(' ');
        }
        grouped.push(*c);
    }
    grouped.push_str(rest);
    grouped
}

/// Decimal placement followed by grouping; the form every balance is published in.
pub fn format_money(raw_value: &str, precision: u32, currency: &str) -> String {
    group_thousands(&format_amount(raw_value, precision, currency))
}

//! Field-specific coercions applied when projecting a row into a lead.

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::domain::import::CellValue;

/// Parse a currency-like cell ("R$ 1.234,56", "1,234.56", "1500") into a decimal.
///
/// Separator rules: with both `,` and `.` present the last one is the decimal
/// separator. With only one kind, it is a thousands separator when it repeats
/// or is followed by exactly three digits, otherwise the decimal separator.
pub fn parse_decimal(cell: &CellValue) -> Option<BigDecimal> {
    match cell {
        CellValue::Empty => None,
        CellValue::Number(value) if value.is_finite() => {
            BigDecimal::from_str(&value.to_string()).ok()
        }
        CellValue::Number(_) => None,
        CellValue::Text(text) => parse_decimal_text(text),
    }
}

fn parse_decimal_text(text: &str) -> Option<BigDecimal> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let negative = kept.starts_with('-');
    let unsigned: String = kept.chars().filter(|c| *c != '-').collect();

    let decimal_separator = match (unsigned.rfind(','), unsigned.rfind('.')) {
        (Some(comma), Some(dot)) => Some(if comma > dot { ',' } else { '.' }),
        (Some(_), None) => single_separator_role(&unsigned, ','),
        (None, Some(_)) => single_separator_role(&unsigned, '.'),
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(unsigned.len() + 2);
    if negative {
        normalized.push('-');
    }
    for c in unsigned.chars() {
        match c {
            ',' | '.' if Some(c) == decimal_separator => normalized.push('.'),
            ',' | '.' => {}
            digit => normalized.push(digit),
        }
    }
    if normalized.starts_with('.') || normalized.starts_with("-.") {
        normalized = normalized.replacen('.', "0.", 1);
    }
    if normalized.ends_with('.') {
        normalized.pop();
    }

    BigDecimal::from_str(&normalized).ok()
}

/// `Some(sep)` when `sep` acts as decimal separator, `None` when it groups thousands
fn single_separator_role(value: &str, separator: char) -> Option<char> {
    if value.matches(separator).count() > 1 {
        return None;
    }
    let digits_after = value
        .rsplit(separator)
        .next()
        .map(|tail| tail.chars().filter(|c| c.is_ascii_digit()).count())
        .unwrap_or(0);
    if digits_after == 3 {
        None
    } else {
        Some(separator)
    }
}

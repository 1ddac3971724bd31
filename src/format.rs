//! Number formatting for metric cards and chart labels.

use rust_decimal::{Decimal, RoundingStrategy};

/// `$1,234` style, rounded half away from zero to `decimals` places.
pub fn currency(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${}", grouped(rounded.abs(), decimals))
}

/// Ratio rendered as a percentage, or `n/a` when undefined or out of range.
pub fn percent(ratio: Option<Decimal>, decimals: u32) -> String {
    match ratio.and_then(|value| value.checked_mul(Decimal::ONE_HUNDRED)) {
        Some(scaled) => format!(
            "{}%",
            scaled
                .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
                .to_string_padded(decimals)
        ),
        None => "n/a".to_string(),
    }
}

/// A value that is already a percentage (0-100).
pub fn share(value: Option<Decimal>) -> String {
    percent(value.map(|p| p / Decimal::ONE_HUNDRED), 1)
}

pub fn count(value: usize) -> String {
    grouped(Decimal::from(value), 0)
}

fn grouped(value: Decimal, decimals: u32) -> String {
    let text = value.to_string_padded(decimals);
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (text, None),
    };
    let digits = whole.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, digit) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(*digit);
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(&fraction);
    }
    out
}

trait PaddedString {
    fn to_string_padded(&self, decimals: u32) -> String;
}

impl PaddedString for Decimal {
    fn to_string_padded(&self, decimals: u32) -> String {
        let mut value = *self;
        value.rescale(decimals);
        value.to_string()
    }
}

// src/common/format.rs

use rust_decimal::{Decimal, RoundingStrategy};

/// Formata um valor em Reais: `R$ 1.234.567,89`.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    // Sempre com duas casas: "1234567.89"
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if negative {
        format!("-R$ {},{}", grouped, frac_part)
    } else {
        format!("R$ {},{}", grouped, frac_part)
    }
}

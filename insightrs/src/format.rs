//! pt-BR rendering of numbers for table cells, tooltips and summary cards.

use serde_json::Value;

/// `1234.5` with two decimals renders as `1.234,50`.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + integer.len() / 3 + 1);
    // -0,00 reads as zero
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_thousands(integer));
    if let Some(fraction) = fraction {
        out.push(',');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}

/// Plain figure with grouping and at most three decimals: `1.811.547`.
pub fn format_number(value: f64) -> String {
    let formatted = format_decimal(value, 3);
    match formatted.split_once(',') {
        Some((integer, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                integer.to_string()
            } else {
                format!("{integer},{fraction}")
            }
        }
        None => formatted,
    }
}

/// Brazilian real: `R$ 358,32`.
pub fn format_currency(value: f64) -> String {
    let amount = format_decimal(value, 2);
    match amount.strip_prefix('-') {
        Some(positive) => format!("-R$ {positive}"),
        None => format!("R$ {amount}"),
    }
}

/// Table cell text: numbers with exactly two decimals, everything else as-is.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|f| format_decimal(f, 2))
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric reading of a result value; backends may send decimals as strings.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
